//! Schema definitions for trace artifacts.
//!
//! Field names follow the query router's trace output (PascalCase).

use crate::output::FileType;
use serde::{Deserialize, Deserializer, Serialize};

/// One operator of a recorded execution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceNode {
    pub operator_type: String,

    #[serde(default)]
    pub variant: String,

    #[serde(rename = "NoOfCalls", default)]
    pub calls: u64,

    #[serde(rename = "AvgNumberOfRows", default)]
    pub avg_rows: f64,

    #[serde(rename = "MedianNumberOfRows", default)]
    pub median_rows: f64,

    #[serde(default)]
    pub shards_queried: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<TraceNode>,
}

impl TraceNode {
    /// Node without inputs
    pub fn leaf(
        operator_type: &str,
        variant: &str,
        calls: u64,
        avg_rows: f64,
        shards_queried: u64,
    ) -> Self {
        Self {
            operator_type: operator_type.to_string(),
            variant: variant.to_string(),
            calls,
            avg_rows,
            median_rows: avg_rows,
            shards_queried,
            inputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, inputs: Vec<TraceNode>) -> Self {
        self.inputs = inputs;
        self
    }
}

/// A traced query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceQuery {
    #[serde(rename = "Query")]
    pub query: String,

    /// Kept as text; older files wrote it as a number
    #[serde(rename = "LineNumber", deserialize_with = "string_or_number")]
    pub line_number: String,

    #[serde(rename = "Trace")]
    pub trace: TraceNode,
}

/// Trace artifact envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFile {
    #[serde(rename = "fileType")]
    pub file_type: FileType,

    pub queries: Vec<TraceQuery>,
}

impl TraceFile {
    pub fn new(queries: Vec<TraceQuery>) -> Self {
        Self {
            file_type: FileType::Trace,
            queries,
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a line number, found {}",
            other
        ))),
    }
}

/// Order by numeric line number; non-numeric line numbers go last, keeping input order
pub fn sort_by_line_number(queries: &mut [TraceQuery]) {
    queries.sort_by_key(|q| match q.line_number.trim().parse::<u64>() {
        Ok(n) => (0, n),
        Err(_) => (1, 0),
    });
}
