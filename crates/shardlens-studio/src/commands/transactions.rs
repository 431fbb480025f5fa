//! Transactions command implementation.

use super::models::{loader_options, TransactionsArgs};
use crate::loader::open_loader;
use crate::output::{write_artifact, write_artifact_to};
use crate::transactions::analyze_transactions;
use anyhow::{bail, Context, Result};
use colored::*;

/// Execute the transactions command
pub fn execute_transactions(args: TransactionsArgs) -> Result<()> {
    if args.input.trim().is_empty() {
        bail!("Input file or URL is required");
    }

    let options = loader_options(args.csv_config.as_ref(), false)?;
    let mut loader = open_loader(args.input_type, &args.input, &options)
        .with_context(|| format!("Failed to open {}", args.input))?;

    let artifact = analyze_transactions(loader.as_mut())
        .with_context(|| format!("Failed to read {}", args.input))?;

    match &args.output {
        Some(path) => {
            write_artifact(&artifact, path).context("Failed to write transactions artifact")?;
            eprintln!(
                "🔁 {} signatures written to {}",
                artifact.signatures.len(),
                path.display().to_string().cyan()
            );
        }
        None => write_artifact_to(&artifact, std::io::stdout().lock())
            .context("Failed to write transactions artifact")?,
    }

    Ok(())
}
