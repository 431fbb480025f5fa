//! Schema definitions for keys artifacts.
//!
//! These structures are written by the keys analyzer and read back by the
//! keys summarizer.

use crate::output::FileType;
use crate::sql::{ColumnRef, ColumnUse, JoinPredicate, StatementType};
use serde::{Deserialize, Serialize};

fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

fn is_zero_u64(value: &u64) -> bool {
    *value == 0
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

/// Complete keys artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysArtifact {
    /// Always `keys`; serialized first
    #[serde(rename = "fileType")]
    pub file_type: FileType,

    /// One entry per canonical query, ascending by first line
    pub queries: Vec<QueryAnalysisResult>,

    /// Statements that failed to parse or analyze
    #[serde(default)]
    pub failed: Vec<QueryFailure>,

    /// Tables named by statements following a `reference` directive
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_tables: Vec<String>,
}

impl KeysArtifact {
    pub fn new(queries: Vec<QueryAnalysisResult>, failed: Vec<QueryFailure>) -> Self {
        Self {
            file_type: FileType::Keys,
            queries,
            failed,
            reference_tables: Vec::new(),
        }
    }
}

/// Analysis of one canonical query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysisResult {
    /// Canonical, normalized SQL text
    pub query_structure: String,

    pub usage_count: usize,

    /// Source lines in encounter order
    pub line_numbers: Vec<usize>,

    pub table_names: Vec<String>,

    pub statement_type: StatementType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_columns: Vec<ColumnUse>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouping_columns: Vec<ColumnRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub join_predicates: Vec<JoinPredicate>,

    /// Total seconds spent executing, summed over occurrences
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub query_time: f64,

    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub lock_time: f64,

    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub rows_sent: u64,

    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub rows_examined: u64,

    /// Latest observed unix timestamp
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub timestamp: i64,
}

/// A statement the analyzer could not handle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub query: String,

    pub error: String,

    pub line_numbers: Vec<usize>,

    /// Raised under an `error` directive
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expected: bool,
}
