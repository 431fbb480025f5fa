//! SQL script loader with directive recognition.
//!
//! `#` lines are comments, `--` lines are directives, everything else is SQL
//! that accumulates until a line ending in `;`.

use super::directive::Directive;
use super::record::{QueryKind, Record};
use super::source::LineSource;
use super::Loader;
use crate::utils::config::MIN_STATEMENT_LEN_AFTER_DIRECTIVE;
use crate::utils::error::LoadError;
use log::debug;
use std::io::BufRead;

/// Streaming SQL script decoder
pub struct SqlScriptLoader {
    source: LineSource,
    text: String,
    start_line: usize,
    in_stmt: bool,
    after_directive: bool,
}

impl SqlScriptLoader {
    pub fn open(source: &str) -> Result<Self, LoadError> {
        Ok(Self::with_source(LineSource::open(source)?))
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self::with_source(LineSource::new(Box::new(reader)))
    }

    fn with_source(source: LineSource) -> Self {
        Self {
            source,
            text: String::new(),
            start_line: 0,
            in_stmt: false,
            after_directive: false,
        }
    }
}

impl Iterator for SqlScriptLoader {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some((line_number, line)) = self.source.next_line() {
            let trimmed = line.trim();

            if let Some(body) = trimmed.strip_prefix("--") {
                return match Directive::parse(body, line_number) {
                    Ok(directive) => {
                        self.after_directive = true;
                        Some(Record::other(
                            QueryKind::Directive(directive),
                            trimmed,
                            line_number,
                        ))
                    }
                    Err(e) => {
                        self.source.fail(e);
                        None
                    }
                };
            }

            if let Some(body) = trimmed.strip_prefix('#') {
                if self.in_stmt {
                    continue;
                }
                let kind = if body.trim_start().starts_with("--") {
                    QueryKind::CommentWithDirective
                } else {
                    QueryKind::Comment
                };
                return Some(Record::other(kind, trimmed, line_number));
            }

            if trimmed.is_empty() {
                if self.in_stmt {
                    continue;
                }
                return Some(Record::other(QueryKind::EmptyLine, "", line_number));
            }

            if self.in_stmt {
                self.text.push('\n');
            } else {
                self.start_line = line_number;
                self.in_stmt = true;
            }
            self.text.push_str(trimmed);

            if !trimmed.ends_with(';') {
                continue;
            }

            let text = std::mem::take(&mut self.text);
            self.in_stmt = false;
            let after_directive = std::mem::replace(&mut self.after_directive, false);

            if after_directive && text.trim().len() < MIN_STATEMENT_LEN_AFTER_DIRECTIVE {
                debug!("Dropping short statement at line {}", self.start_line);
                continue;
            }

            return Some(Record::sql(text, self.start_line));
        }

        if !self.source.has_failed() && self.in_stmt && !self.text.is_empty() {
            self.source.fail(LoadError::MissingSemicolon);
        }
        None
    }
}

impl Loader for SqlScriptLoader {
    fn close(&mut self) -> Result<(), LoadError> {
        self.source.close()
    }
}
