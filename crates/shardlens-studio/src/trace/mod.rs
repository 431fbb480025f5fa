//! Trace summarization and comparison.
//!
//! A trace artifact holds one recorded execution-plan tree per query. Each
//! tree reduces to four metrics; two runs compare query by query.

pub mod diff;
pub mod output;
pub mod schema;
pub mod summary;

pub use diff::{diff_traces, format_pct, MetricChange, QueryDiff, TraceDiff};
pub use output::{render_trace_diff, render_trace_summary};
pub use schema::{sort_by_line_number, TraceFile, TraceNode, TraceQuery};
pub use summary::{
    summarize_queries, summarize_trace, QuerySummary, TracedQuerySummary, METRIC_NAMES,
};

use crate::output::{sniff_file_type, FileType};
use crate::utils::error::OutputError;
use log::debug;
use std::fs;
use std::path::Path;

/// Read a trace artifact (envelope or historical root array), ordered by line number
///
/// # Errors
/// * `OutputError::WrongFileType` - the file is another kind of artifact
/// * `OutputError::Json` - malformed JSON
pub fn read_trace(path: impl AsRef<Path>) -> Result<Vec<TraceQuery>, OutputError> {
    let path = path.as_ref();
    let found = sniff_file_type(path)?;
    if found != FileType::Trace {
        return Err(OutputError::WrongFileType {
            path: path.display().to_string(),
            expected: FileType::Trace.to_string(),
            found: found.to_string(),
        });
    }

    let contents = fs::read_to_string(path)?;
    let mut queries = if contents.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<TraceQuery>>(&contents)?
    } else {
        serde_json::from_str::<TraceFile>(&contents)?.queries
    };

    sort_by_line_number(&mut queries);
    debug!("Read {} traced queries from {}", queries.len(), path.display());
    Ok(queries)
}
