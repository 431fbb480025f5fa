//! CSV workload export loader.
//!
//! Which column holds what is described by a [`CsvConfig`]; any optional
//! column set to `-1` yields zero for that metric.

use super::record::{QueryMetrics, Record};
use super::source::open_reader;
use super::Loader;
use crate::utils::config::{CsvConfig, CSV_TIMESTAMP_FORMAT};
use crate::utils::error::LoadError;
use chrono::NaiveDateTime;
use std::io::BufRead;
use std::str::FromStr;

/// Streaming CSV decoder
pub struct CsvLoader {
    records: csv::StringRecordsIntoIter<Box<dyn BufRead>>,
    config: CsvConfig,
    error: Option<LoadError>,
    done: bool,
}

impl CsvLoader {
    pub fn open(source: &str, config: CsvConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self::with_reader(open_reader(source)?, config))
    }

    pub fn from_reader(reader: impl BufRead + 'static, config: CsvConfig) -> Result<Self, LoadError> {
        config.validate()?;
        Ok(Self::with_reader(Box::new(reader), config))
    }

    fn with_reader(reader: Box<dyn BufRead>, config: CsvConfig) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(config.header)
            .flexible(true)
            .from_reader(reader)
            .into_records();

        Self {
            records,
            config,
            error: None,
            done: false,
        }
    }

    fn decode(&self, row: &csv::StringRecord) -> Result<Record, LoadError> {
        let line = row.position().map(|p| p.line() as usize).unwrap_or(0);

        let query = field(row, self.config.query_field)
            .ok_or_else(|| {
                LoadError::format(
                    line,
                    format!("missing query field {}", self.config.query_field),
                )
            })?
            .trim()
            .trim_matches('"');

        if query.is_empty() {
            return Err(LoadError::format(line, "empty query field"));
        }

        let metrics = QueryMetrics {
            connection_id: parse_field(row, self.config.connection_id_field, line)?,
            query_time_seconds: parse_field(row, self.config.query_time_field, line)?,
            lock_time_seconds: parse_field(row, self.config.lock_time_field, line)?,
            rows_sent: parse_field(row, self.config.rows_sent_field, line)?,
            rows_examined: parse_field(row, self.config.rows_examined_field, line)?,
            timestamp_unix: parse_timestamp(row, self.config.timestamp_field, line)?,
        };

        Ok(Record::sql(query, line).with_metrics(metrics))
    }
}

fn field(row: &csv::StringRecord, index: i64) -> Option<&str> {
    usize::try_from(index).ok().and_then(|i| row.get(i))
}

/// Numeric column value; absent columns yield the zero value
fn parse_field<T>(row: &csv::StringRecord, index: i64, line: usize) -> Result<T, LoadError>
where
    T: FromStr + Default,
{
    if index < 0 {
        return Ok(T::default());
    }
    let raw = field(row, index)
        .ok_or_else(|| LoadError::format(line, format!("missing field {}", index)))?
        .trim();
    raw.parse()
        .map_err(|_| LoadError::format(line, format!("invalid value '{}' in field {}", raw, index)))
}

fn parse_timestamp(row: &csv::StringRecord, index: i64, line: usize) -> Result<i64, LoadError> {
    if index < 0 {
        return Ok(0);
    }
    let raw = field(row, index)
        .ok_or_else(|| LoadError::format(line, format!("missing field {}", index)))?
        .trim();
    NaiveDateTime::parse_from_str(raw, CSV_TIMESTAMP_FORMAT)
        .map(|ts| ts.and_utc().timestamp())
        .map_err(|e| LoadError::format(line, format!("invalid timestamp '{}': {}", raw, e)))
}

impl Iterator for CsvLoader {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.done {
            return None;
        }

        let result = match self.records.next()? {
            Ok(row) => self.decode(&row),
            Err(e) => Err(LoadError::Csv(e)),
        };

        match result {
            Ok(record) => Some(record),
            Err(e) => {
                self.error = Some(e);
                self.done = true;
                None
            }
        }
    }
}

impl Loader for CsvLoader {
    fn close(&mut self) -> Result<(), LoadError> {
        self.done = true;
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
