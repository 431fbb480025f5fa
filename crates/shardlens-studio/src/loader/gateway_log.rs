//! Query-router (gateway) query log loader.
//!
//! Each line is a tab-delimited tuple. One field holds the SQL as a quoted
//! string and the field right after it may hold the bind variables as JSON:
//! `{"v1": {"type": "INT64", "value": 1}}`.

use super::record::Record;
use super::source::LineSource;
use super::Loader;
use crate::sql::{bind_variables, BindVariable};
use crate::utils::error::LoadError;
use log::debug;
use std::collections::HashMap;
use std::io::BufRead;

const REDACTED_MARKER: &str = "[REDACTED]";

/// Streaming gateway-log decoder
pub struct GatewayLogLoader {
    source: LineSource,
    substitute_bind_vars: bool,
}

impl GatewayLogLoader {
    /// Open a gateway log. With `substitute_bind_vars` the bind variables are
    /// written back into the statement; otherwise the statement is kept verbatim.
    pub fn open(source: &str, substitute_bind_vars: bool) -> Result<Self, LoadError> {
        Ok(Self::with_source(
            LineSource::open(source)?,
            substitute_bind_vars,
        ))
    }

    pub fn from_reader(reader: impl BufRead + 'static, substitute_bind_vars: bool) -> Self {
        Self::with_source(LineSource::new(Box::new(reader)), substitute_bind_vars)
    }

    fn with_source(source: LineSource, substitute_bind_vars: bool) -> Self {
        Self {
            source,
            substitute_bind_vars,
        }
    }

    fn decode_line(&self, line: &str, line_number: usize) -> Result<Record, LoadError> {
        let fields: Vec<&str> = line.split('\t').collect();

        let sql_index = fields
            .iter()
            .position(|f| is_quoted(f))
            .ok_or_else(|| LoadError::format(line_number, "no quoted SQL statement found"))?;

        let sql: String = serde_json::from_str(fields[sql_index]).map_err(|e| {
            LoadError::format(line_number, format!("cannot unquote statement: {}", e))
        })?;

        if !self.substitute_bind_vars {
            return Ok(Record::sql(sql, line_number));
        }

        let raw_vars = fields.get(sql_index + 1).map(|f| f.trim()).unwrap_or_default();

        // Redacted variables come either as a bare "[REDACTED]" field or inside the map
        if raw_vars.contains(REDACTED_MARKER) {
            return Err(LoadError::RedactedBindVariables { line: line_number });
        }

        if !raw_vars.starts_with('{') {
            return Ok(Record::sql(sql, line_number));
        }

        let vars: HashMap<String, BindVariable> = serde_json::from_str(raw_vars).map_err(|e| {
            LoadError::format(line_number, format!("invalid bind variables: {}", e))
        })?;

        let bound = bind_variables(&sql, &vars).map_err(|source| LoadError::BindVariables {
            line: line_number,
            source,
        })?;

        Ok(Record::sql(bound, line_number))
    }
}

fn is_quoted(field: &str) -> bool {
    let field = field.trim();
    field.len() >= 2 && field.starts_with('"') && field.ends_with('"')
}

impl Iterator for GatewayLogLoader {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some((line_number, line)) = self.source.next_line() {
            if line.trim().is_empty() {
                continue;
            }

            match self.decode_line(&line, line_number) {
                Ok(record) => return Some(record),
                Err(e) => {
                    debug!("Gateway log failed at line {}", line_number);
                    self.source.fail(e);
                    return None;
                }
            }
        }
        None
    }
}

impl Loader for GatewayLogLoader {
    fn close(&mut self) -> Result<(), LoadError> {
        self.source.close()
    }
}
