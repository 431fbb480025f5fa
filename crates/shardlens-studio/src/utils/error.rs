//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that stop a loader. Once raised they are sticky: the loader yields
/// no further records and `close` reports the failure.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("line {line}: {message}")]
    Format { line: usize, message: String },

    #[error("line {line}: unknown directive '{verb}'")]
    UnknownDirective { line: usize, verb: String },

    #[error("line {line}: invalid directive: {message}")]
    InvalidDirective { line: usize, message: String },

    #[error("EOF: missing semicolon")]
    MissingSemicolon,

    #[error("line {line}: query has redacted bind variables, cannot parse them")]
    RedactedBindVariables { line: usize },

    #[error("line {line}: {source}")]
    BindVariables {
        line: usize,
        #[source]
        source: SqlError,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid loader configuration: {0}")]
    Config(#[from] ConfigError),
}

impl LoadError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }
}

/// Errors raised while parsing or analyzing a single statement.
///
/// These are recovered by the analyzers and recorded alongside the results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SqlError {
    #[error("syntax error: {0}")]
    Parse(String),

    #[error("expected a single statement, found {0}")]
    StatementCount(usize),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("column '{0}' is ambiguous")]
    AmbiguousColumn(String),

    #[error("unsupported bind variable type {kind} for '{name}'")]
    UnsupportedBindVariable { name: String, kind: String },

    #[error("invalid value for bind variable '{0}'")]
    InvalidBindVariable(String),
}

impl From<sqlparser::parser::ParserError> for SqlError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors that can occur during artifact input/output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("{0}: first key must be \"fileType\"")]
    MissingFileType(String),

    #[error("{path}: unknown file type '{file_type}'")]
    UnknownFileType { path: String, file_type: String },

    #[error("{path}: expected file type '{expected}', found '{found}'")]
    WrongFileType {
        path: String,
        expected: String,
        found: String,
    },

    #[error("{0}: unexpected first token, expected '{{' or '['")]
    UnexpectedToken(String),

    #[error("{0}: no summarizer for file type '{1}'")]
    Unsupported(String, String),

    #[error("{file_type} summaries take {expected} file(s), got {count}")]
    FileCount {
        file_type: String,
        expected: &'static str,
        count: usize,
    },
}

/// Errors in user-supplied configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}
