//! Keys command implementation.
//! Loads a workload, runs the keys analyzer and writes the artifact.

use super::models::{loader_options, KeysArgs};
use crate::keys::analyze_keys;
use crate::loader::{open_loader, InputType};
use crate::output::{write_artifact, write_artifact_to};
use anyhow::{bail, Context, Result};
use colored::*;
use log::info;

/// Validate keys arguments before any file is opened
pub fn validate_keys_args(args: &KeysArgs) -> Result<()> {
    if args.input.trim().is_empty() {
        bail!("Input file or URL is required");
    }
    if args.input_type == InputType::Csv && args.csv_config.is_none() {
        bail!("CSV input requires --csv-config");
    }
    if args.bind_variables && args.input_type != InputType::GatewayLog {
        bail!("--bind-variables only applies to gateway logs");
    }
    Ok(())
}

/// Execute the keys command
pub fn execute_keys(args: KeysArgs) -> Result<()> {
    validate_keys_args(&args)?;

    // Step 1: Open the workload
    let options = loader_options(args.csv_config.as_ref(), args.bind_variables)?;
    let mut loader = open_loader(args.input_type, &args.input, &options)
        .with_context(|| format!("Failed to open {}", args.input))?;

    // Step 2: Analyze
    let artifact = analyze_keys(loader.as_mut(), &args.keys_config)
        .with_context(|| format!("Failed to analyze {}", args.input))?;

    info!(
        "{} distinct queries, {} failed",
        artifact.queries.len(),
        artifact.failed.len()
    );

    // Step 3: Write the artifact
    match &args.output {
        Some(path) => {
            write_artifact(&artifact, path).context("Failed to write keys artifact")?;
            eprintln!(
                "🔑 Keys artifact written to {}",
                path.display().to_string().cyan()
            );
        }
        None => write_artifact_to(&artifact, std::io::stdout().lock())
            .context("Failed to write keys artifact")?,
    }

    Ok(())
}
