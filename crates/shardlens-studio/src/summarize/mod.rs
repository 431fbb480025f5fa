//! Human-readable reports over analysis artifacts.
//!
//! The report is chosen by the artifact's `fileType`:
//! - `keys`: per-table column usage
//! - `transactions`: repeated transaction signatures
//! - `trace`: one file summarizes, two files compare

pub mod keys;
pub mod transactions;

pub use keys::{render_keys_summary, summarize_keys, KeysSummary, Position, TableSummary};
pub use transactions::render_transactions_summary;

use crate::keys::KeysArtifact;
use crate::output::{read_artifact, sniff_file_type, FileType};
use crate::trace::{
    diff_traces, read_trace, render_trace_diff, render_trace_summary, summarize_queries,
};
use crate::transactions::TransactionsArtifact;
use crate::utils::config::SummaryConfig;
use crate::utils::error::OutputError;
use log::info;
use std::path::PathBuf;

/// Read the given artifacts and render the matching report
///
/// # Arguments
/// * `paths` - One artifact, or two trace artifacts to compare
/// * `config` - Threshold and hot-query settings
///
/// # Errors
/// * `OutputError::Unsupported` - `dbinfo` and `planalyze` artifacts
/// * `OutputError::FileCount` - wrong number of files for the kind
/// * Any read or sniffing error
///
/// # Example
/// ```ignore
/// let report = summarize(&[PathBuf::from("keys.json")], &SummaryConfig::default())?;
/// println!("{}", report);
/// ```
pub fn summarize(paths: &[PathBuf], config: &SummaryConfig) -> Result<String, OutputError> {
    let first = paths
        .first()
        .ok_or_else(|| OutputError::InvalidPath("No input files".to_string()))?;
    let file_type = sniff_file_type(first)?;
    info!("Summarizing {} file(s) of type {}", paths.len(), file_type);

    let expect_one = |report: fn(&PathBuf, &SummaryConfig) -> Result<String, OutputError>| {
        if paths.len() != 1 {
            return Err(OutputError::FileCount {
                file_type: file_type.to_string(),
                expected: "1",
                count: paths.len(),
            });
        }
        report(first, config)
    };

    match file_type {
        FileType::Keys => expect_one(|path, config| {
            let artifact: KeysArtifact = read_artifact(path, FileType::Keys)?;
            Ok(render_keys_summary(&summarize_keys(&artifact, config)))
        }),
        FileType::Transactions => expect_one(|path, _| {
            let artifact: TransactionsArtifact = read_artifact(path, FileType::Transactions)?;
            Ok(render_transactions_summary(&artifact))
        }),
        FileType::Trace => match paths {
            [only] => Ok(render_trace_summary(&summarize_queries(&read_trace(only)?))),
            [before, after] => {
                let diff = diff_traces(
                    &read_trace(before)?,
                    &read_trace(after)?,
                    config.significant_change_threshold,
                );
                Ok(render_trace_diff(&diff))
            }
            _ => Err(OutputError::FileCount {
                file_type: file_type.to_string(),
                expected: "1 or 2",
                count: paths.len(),
            }),
        },
        FileType::DbInfo | FileType::Planalyze => Err(OutputError::Unsupported(
            first.display().to_string(),
            file_type.to_string(),
        )),
    }
}
