//! SQL front-end shared by the analyzers.
//!
//! Built on `sqlparser` with the MySQL dialect:
//! - [`parse`] a single statement
//! - [`normalize`] literals into placeholders and [`canonicalize`] to text
//! - [`extract_keys`] tables, filter/grouping columns and join predicates
//! - [`bind_variables`] back into statements read from gateway logs

pub mod bind;
pub mod keys;
pub mod normalize;
pub mod schema;

pub use bind::{bind_variables, BindVariable};
pub use keys::{extract_keys, ColumnRef, ColumnUse, ComparisonOp, JoinPredicate, QueryKeys};
pub use normalize::{normalize, BindVar};
pub use schema::{ColumnInfo, SchemaInfo};

use crate::loader::first_word;
use crate::utils::error::SqlError;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use std::fmt;

/// Parse exactly one statement
pub fn parse(sql: &str) -> Result<Statement, SqlError> {
    let mut statements = Parser::parse_sql(&MySqlDialect {}, sql)?;
    if statements.len() != 1 {
        return Err(SqlError::StatementCount(statements.len()));
    }
    Ok(statements.remove(0))
}

/// Stable textual form of a statement
pub fn canonicalize(statement: &Statement) -> String {
    statement.to_string()
}

/// Parse, normalize and canonicalize in one step
pub fn canonical_text(sql: &str) -> Result<String, SqlError> {
    let mut statement = parse(sql)?;
    normalize(&mut statement);
    Ok(canonicalize(&statement))
}

/// Drop a leading `VEXPLAIN [ALL|PLAN|QUERIES|TRACE|KEYS]`, returning the inner statement
pub fn strip_vexplain(sql: &str) -> &str {
    let trimmed = sql.trim_start();
    let word = first_word(trimmed);
    if !word.eq_ignore_ascii_case("vexplain") {
        return sql;
    }

    let rest = trimmed[word.len()..].trim_start();
    let next = first_word(rest);
    let is_format = ["all", "plan", "queries", "trace", "keys"]
        .iter()
        .any(|f| next.eq_ignore_ascii_case(f));

    if is_format {
        rest[next.len()..].trim_start()
    } else {
        rest
    }
}

/// Statement category used for read/write accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Replace,
    Ddl,
    Other,
}

impl StatementType {
    /// Classify from the leading keyword
    pub fn from_first_word(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => Self::Select,
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "REPLACE" => Self::Replace,
            "CREATE" | "ALTER" | "DROP" | "TRUNCATE" | "RENAME" => Self::Ddl,
            _ => Self::Other,
        }
    }

    /// Classify a parsed statement
    pub fn of(statement: &Statement) -> Self {
        match statement {
            Statement::Query(_) => Self::Select,
            Statement::Insert(insert) if insert.replace_into => Self::Replace,
            Statement::Insert(_) => Self::Insert,
            Statement::Update { .. } => Self::Update,
            Statement::Delete(_) => Self::Delete,
            other => match Self::from_first_word(first_word(&other.to_string())) {
                Self::Ddl => Self::Ddl,
                _ => Self::Other,
            },
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Self::Select)
    }

    pub fn is_dml(&self) -> bool {
        matches!(
            self,
            Self::Insert | Self::Update | Self::Delete | Self::Replace
        )
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Replace => "REPLACE",
            Self::Ddl => "DDL",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}
