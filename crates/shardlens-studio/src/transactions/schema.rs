//! Schema definitions for transactions artifacts.

use crate::output::FileType;
use crate::sql::{ComparisonOp, StatementType};
use serde::{Deserialize, Serialize};

/// Complete transactions artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionsArtifact {
    /// Always `transactions`; serialized first
    #[serde(rename = "fileType")]
    pub file_type: FileType,

    /// Repeated signatures, descending by count
    pub signatures: Vec<SignatureCount>,
}

/// A signature seen more than once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureCount {
    pub count: usize,
    pub queries: Vec<QueryShape>,
}

/// The shape of one statement inside a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryShape {
    pub op: StatementType,

    pub affected_table: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updated_columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,
}

/// `column op literal` with the literal replaced by a value slot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub table: String,
    pub col: String,
    pub op: ComparisonOp,

    /// Transaction-local value slot; `-1` after anonymization means the value was used once
    pub val: i64,
}
