//! Artifact writers and readers.
//!
//! Every analyzer output is a JSON object whose first key is `fileType`:
//! - pretty JSON written atomically from in-memory values
//! - file-kind sniffing for downstream readers
//! - a streaming trace writer

pub mod json;
pub mod trace_writer;

pub use json::{read_artifact, sniff_file_type, write_artifact, write_artifact_to};
pub use trace_writer::TraceWriter;

use crate::utils::error::OutputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Kind of analysis that produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Keys,
    Transactions,
    DbInfo,
    Trace,
    Planalyze,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keys => "keys",
            Self::Transactions => "transactions",
            Self::DbInfo => "dbinfo",
            Self::Trace => "trace",
            Self::Planalyze => "planalyze",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keys" => Ok(Self::Keys),
            "transactions" => Ok(Self::Transactions),
            "dbinfo" => Ok(Self::DbInfo),
            "trace" => Ok(Self::Trace),
            "planalyze" => Ok(Self::Planalyze),
            other => Err(other.to_string()),
        }
    }
}

/// Common path validation for output files
pub fn validate_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
