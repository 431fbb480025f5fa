//! Summarize command implementation.

use super::models::SummarizeArgs;
use crate::summarize::summarize;
use anyhow::{bail, Context, Result};

/// Execute the summarize command
pub fn execute_summarize(args: SummarizeArgs) -> Result<()> {
    if args.files.is_empty() {
        bail!("At least one artifact file is required");
    }

    let config = args.summary_config()?;
    let report = summarize(&args.files, &config).context("Failed to summarize artifacts")?;
    println!("{}", report);

    Ok(())
}
