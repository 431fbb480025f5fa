//! MySQL general query log loader.
//!
//! Entries look like `2024-03-01T10:00:00.123456Z   12 Query  select 1`.
//! Lines that do not start an entry continue the previous `Query` text.

use super::record::{QueryMetrics, Record};
use super::source::LineSource;
use super::Loader;
use crate::utils::error::LoadError;
use chrono::DateTime;
use regex::Regex;
use std::io::BufRead;
use std::sync::LazyLock;

static ENTRY: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2}))\s+(\d+)\s+(\w+)\s*(.*)$")
        .ok()
});

struct PendingQuery {
    text: String,
    line_number: usize,
    metrics: QueryMetrics,
}

impl PendingQuery {
    fn into_record(self) -> Option<Record> {
        let text = self.text.trim_end();
        if text.is_empty() {
            return None;
        }
        Some(Record::sql(text, self.line_number).with_metrics(self.metrics))
    }
}

/// Streaming general-log decoder
pub struct GeneralLogLoader {
    source: LineSource,
    pending: Option<PendingQuery>,
}

impl GeneralLogLoader {
    pub fn open(source: &str) -> Result<Self, LoadError> {
        Ok(Self::with_source(LineSource::open(source)?))
    }

    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self::with_source(LineSource::new(Box::new(reader)))
    }

    fn with_source(source: LineSource) -> Self {
        Self {
            source,
            pending: None,
        }
    }
}

impl Iterator for GeneralLogLoader {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        while let Some((line_number, line)) = self.source.next_line() {
            let Some(caps) = ENTRY.as_ref().and_then(|re| re.captures(&line)) else {
                // Continuation; the prologue before the first entry has nothing to join
                if let Some(pending) = self.pending.as_mut() {
                    pending.text.push('\n');
                    pending.text.push_str(&line);
                }
                continue;
            };

            let finished = self.pending.take();

            if &caps[3] == "Query" {
                let timestamp = match DateTime::parse_from_rfc3339(&caps[1]) {
                    Ok(ts) => ts.timestamp(),
                    Err(e) => {
                        self.source.fail(LoadError::format(
                            line_number,
                            format!("invalid timestamp '{}': {}", &caps[1], e),
                        ));
                        return None;
                    }
                };
                let connection_id = match caps[2].parse() {
                    Ok(id) => id,
                    Err(_) => {
                        self.source.fail(LoadError::format(
                            line_number,
                            format!("invalid connection id '{}'", &caps[2]),
                        ));
                        return None;
                    }
                };

                self.pending = Some(PendingQuery {
                    text: caps[4].to_string(),
                    line_number,
                    metrics: QueryMetrics {
                        connection_id,
                        timestamp_unix: timestamp,
                        ..Default::default()
                    },
                });
            }

            if let Some(record) = finished.and_then(PendingQuery::into_record) {
                return Some(record);
            }
        }

        if self.source.has_failed() {
            return None;
        }
        self.pending.take().and_then(PendingQuery::into_record)
    }
}

impl Loader for GeneralLogLoader {
    fn close(&mut self) -> Result<(), LoadError> {
        self.source.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LOG: &str = "/usr/sbin/mysqld, Version: 8.0.36. started with:
Tcp port: 3306  Unix socket: /tmp/mysql.sock
Time                 Id Command    Argument
2024-03-01T10:00:00.000001Z\t   12 Connect\tapp@localhost on shop using Socket
2024-03-01T10:00:00.000002Z\t   12 Query\tselect *
from users
where id = 1
2024-03-01T10:00:01.000000Z\t   13 Query\tupdate users set name = 'x' where id = 2
2024-03-01T10:00:02.000000Z\t   12 Quit\t
";

    #[test]
    fn test_reads_queries_and_joins_continuations() {
        let records: Vec<Record> = GeneralLogLoader::from_reader(Cursor::new(LOG)).collect();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].query_text, "select *\nfrom users\nwhere id = 1");
        assert_eq!(records[0].line_number, 5);
        let m = records[0].metrics.unwrap();
        assert_eq!(m.connection_id, 12);
        assert_eq!(m.timestamp_unix, 1709287200);

        assert_eq!(records[1].first_word, "update");
        assert_eq!(records[1].connection_id(), 13);
    }

    #[test]
    fn test_last_query_is_flushed_at_eof() {
        let log = "2024-03-01T10:00:00Z 1 Query select 1\n";
        let mut loader = GeneralLogLoader::from_reader(Cursor::new(log));
        assert_eq!(loader.next().unwrap().query_text, "select 1");
        assert!(loader.next().is_none());
        assert!(loader.close().is_ok());
    }
}
