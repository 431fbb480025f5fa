//! MySQL slow-query log loader.
//!
//! A slow log is a server prologue followed by blocks of the shape:
//! ```text
//! # Time: 2024-03-01T10:00:00.000000Z
//! # User@Host: app[app] @ localhost []  Id:    12
//! # Query_time: 0.000153  Lock_time: 0.000002 Rows_sent: 1  Rows_examined: 1
//! SET timestamp=1709287200;
//! select * from users where id = 3;
//! ```

use super::record::{QueryMetrics, Record};
use super::source::LineSource;
use super::Loader;
use crate::utils::error::LoadError;
use std::io::BufRead;

/// Streaming slow-query log decoder
pub struct SlowQueryLogLoader {
    source: LineSource,
    text: String,
    start_line: usize,
    in_stmt: bool,
    have_metadata: bool,
    seen_block: bool,
    metrics: QueryMetrics,
}

impl SlowQueryLogLoader {
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
            have_metadata: false,
            seen_block: false,
            metrics: QueryMetrics::default(),
        }
    }

    /// Read `Key: value` pairs from a comment line into the pending metrics
    fn parse_metadata(&mut self, line: &str, line_number: usize) -> Result<(), LoadError> {
        let mut tokens = line.trim_start_matches('#').split_whitespace().peekable();

        while let Some(token) = tokens.next() {
            let Some(key) = token.strip_suffix(':') else {
                continue;
            };
            let Some(value) = tokens.peek().copied() else {
                break;
            };

            let bad_value =
                || LoadError::format(line_number, format!("invalid value '{}' for {}", value, key));

            match key {
                "Query_time" => {
                    self.metrics.query_time_seconds = value.parse().map_err(|_| bad_value())?;
                    self.have_metadata = true;
                }
                "Lock_time" => {
                    self.metrics.lock_time_seconds = value.parse().map_err(|_| bad_value())?;
                }
                "Rows_sent" => {
                    self.metrics.rows_sent = value.parse().map_err(|_| bad_value())?;
                }
                "Rows_examined" => {
                    self.metrics.rows_examined = value.parse().map_err(|_| bad_value())?;
                }
                "Id" => {
                    self.metrics.connection_id = value.parse().map_err(|_| bad_value())?;
                }
                _ => continue,
            }
            tokens.next();
        }

        Ok(())
    }

    fn take_record(&mut self) -> Record {
        let text = std::mem::take(&mut self.text);
        let metrics = std::mem::take(&mut self.metrics);
        self.in_stmt = false;
        self.have_metadata = false;
        Record::sql(text, self.start_line).with_metrics(metrics)
    }
}

/// `SET timestamp=<int>;` value, when the line has that shape
fn set_timestamp_value(line: &str) -> Option<&str> {
    let prefix = "set timestamp=";
    if line.len() < prefix.len() || !line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        return None;
    }
    Some(line[prefix.len()..].trim_end_matches(';').trim())
}

impl Iterator for SlowQueryLogLoader {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some((line_number, raw)) = self.source.next_line() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('#') {
                self.seen_block = true;
                if let Err(e) = self.parse_metadata(line, line_number) {
                    self.source.fail(e);
                    return None;
                }
                continue;
            }

            // Server prologue before the first block
            if !self.seen_block {
                continue;
            }

            if self.have_metadata && !self.in_stmt {
                if let Some(value) = set_timestamp_value(line) {
                    match value.parse() {
                        Ok(ts) => self.metrics.timestamp_unix = ts,
                        Err(_) => {
                            self.source.fail(LoadError::format(
                                line_number,
                                format!("invalid timestamp '{}'", value),
                            ));
                            return None;
                        }
                    }
                    continue;
                }
            }

            if self.in_stmt {
                self.text.push('\n');
                self.text.push_str(line);
            } else {
                self.text.push_str(line);
                self.start_line = line_number;
                self.in_stmt = true;
            }

            if line.ends_with(';') {
                return Some(self.take_record());
            }
        }

        if !self.source.has_failed() && self.in_stmt && !self.text.is_empty() {
            self.source.fail(LoadError::MissingSemicolon);
        }
        None
    }
}

impl Loader for SlowQueryLogLoader {
    fn close(&mut self) -> Result<(), LoadError> {
        self.source.close()
    }
}
