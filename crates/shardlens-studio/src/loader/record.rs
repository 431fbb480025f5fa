//! The uniform record every loader produces.

use super::directive::Directive;

/// What a record represents
#[derive(Debug, Clone, PartialEq, Default)]
pub enum QueryKind {
    #[default]
    Sql,
    Comment,
    /// A `#` comment whose body is itself a `--` directive line (commented out)
    CommentWithDirective,
    EmptyLine,
    Directive(Directive),
}

/// Metrics attached by loaders that read structured logs
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QueryMetrics {
    pub connection_id: u64,
    pub query_time_seconds: f64,
    pub lock_time_seconds: f64,
    pub rows_sent: u64,
    pub rows_examined: u64,
    pub timestamp_unix: i64,
}

/// One observed SQL event
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub query_text: String,

    /// Leading word of the statement, stopped at whitespace, `(` or `;`
    pub first_word: String,

    /// 1-based line in the source where the record starts
    pub line_number: usize,

    pub kind: QueryKind,

    pub metrics: Option<QueryMetrics>,
}

impl Record {
    /// Build a SQL record
    pub fn sql(query_text: impl Into<String>, line_number: usize) -> Self {
        let query_text = query_text.into();
        Self {
            first_word: first_word(&query_text).to_string(),
            query_text,
            line_number,
            kind: QueryKind::Sql,
            metrics: None,
        }
    }

    /// Build a non-SQL record (comment, directive, empty line)
    pub fn other(kind: QueryKind, text: impl Into<String>, line_number: usize) -> Self {
        Self {
            query_text: text.into(),
            first_word: String::new(),
            line_number,
            kind,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: QueryMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn is_sql(&self) -> bool {
        self.kind == QueryKind::Sql
    }

    /// Connection the record belongs to; records without metrics share connection 0
    pub fn connection_id(&self) -> u64 {
        self.metrics.map(|m| m.connection_id).unwrap_or(0)
    }
}

/// Extract the leading word of a statement
pub fn first_word(query: &str) -> &str {
    let trimmed = query.trim_start();
    let end = trimmed
        .find(|c: char| c.is_whitespace() || c == '(' || c == ';')
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}
