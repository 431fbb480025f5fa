//! Configuration and constants for the tool-suite.

use super::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Current artifact schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// A per-query change below `-SIGNIFICANT_CHANGE_THRESHOLD` percent is an improvement worth flagging
pub const SIGNIFICANT_CHANGE_THRESHOLD: f64 = 10.0;

/// How many records the transaction builder inspects to infer autocommit
pub const AUTOCOMMIT_SCAN_LIMIT: usize = 1000;

/// Number of hot queries listed in a keys summary
pub const DEFAULT_HOT_QUERY_LIMIT: usize = 10;

/// Timestamp layout used by CSV exports
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Statements shorter than this after a directive are dropped by the script loader
pub const MIN_STATEMENT_LEN_AFTER_DIRECTIVE: usize = 3;

/// Field indices for CSV workload exports. `-1` means the column is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvConfig {
    #[serde(default)]
    pub header: bool,

    pub query_field: i64,

    #[serde(default = "absent_field")]
    pub connection_id_field: i64,

    #[serde(default = "absent_field")]
    pub query_time_field: i64,

    #[serde(default = "absent_field")]
    pub lock_time_field: i64,

    #[serde(default = "absent_field")]
    pub rows_sent_field: i64,

    #[serde(default = "absent_field")]
    pub rows_examined_field: i64,

    #[serde(default = "absent_field")]
    pub timestamp_field: i64,
}

fn absent_field() -> i64 {
    -1
}

impl CsvConfig {
    /// Config with only the query column mapped
    pub fn with_query_field(query_field: i64) -> Self {
        Self {
            header: false,
            query_field,
            connection_id_field: -1,
            query_time_field: -1,
            lock_time_field: -1,
            rows_sent_field: -1,
            rows_examined_field: -1,
            timestamp_field: -1,
        }
    }

    /// Reject indices the loader cannot use
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_field < 0 {
            return Err(ConfigError::Invalid(format!(
                "query_field must be non-negative, got {}",
                self.query_field
            )));
        }

        let optional = [
            ("connection_id_field", self.connection_id_field),
            ("query_time_field", self.query_time_field),
            ("lock_time_field", self.lock_time_field),
            ("rows_sent_field", self.rows_sent_field),
            ("rows_examined_field", self.rows_examined_field),
            ("timestamp_field", self.timestamp_field),
        ];
        for (name, index) in optional {
            if index < -1 {
                return Err(ConfigError::Invalid(format!(
                    "{} must be -1 or a column index, got {}",
                    name, index
                )));
            }
        }

        Ok(())
    }
}

/// Load and validate a CSV loader configuration from TOML
///
/// # Example
/// ```ignore
/// // csv.toml
/// // header = true
/// // query_field = 3
/// // connection_id_field = 0
/// let config = load_csv_config("csv.toml")?;
/// ```
pub fn load_csv_config(path: impl AsRef<Path>) -> Result<CsvConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: CsvConfig = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Knobs for the human-readable summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Improvement (in percent) beyond which a traced query is flagged
    #[serde(default = "default_threshold")]
    pub significant_change_threshold: f64,

    /// Number of hot queries listed for a keys file
    #[serde(default = "default_hot_query_limit")]
    pub hot_query_limit: usize,
}

fn default_threshold() -> f64 {
    SIGNIFICANT_CHANGE_THRESHOLD
}

fn default_hot_query_limit() -> usize {
    DEFAULT_HOT_QUERY_LIMIT
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            significant_change_threshold: SIGNIFICANT_CHANGE_THRESHOLD,
            hot_query_limit: DEFAULT_HOT_QUERY_LIMIT,
        }
    }
}

/// Load summary settings from TOML
pub fn load_summary_config(path: impl AsRef<Path>) -> Result<SummaryConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: SummaryConfig = toml::from_str(&contents)?;
    if config.significant_change_threshold < 0.0 {
        return Err(ConfigError::Invalid(
            "significant_change_threshold must not be negative".to_string(),
        ));
    }
    Ok(config)
}

/// Settings for a keys analysis run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeysConfig {
    /// Major version per binary, consulted by `skip_if_below_version`.
    /// Binaries missing here are assumed recent enough.
    pub versions: HashMap<String, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_config_defaults_to_absent_fields() {
        let config: CsvConfig = toml::from_str("query_field = 2").unwrap();
        assert!(!config.header);
        assert_eq!(config.query_field, 2);
        assert_eq!(config.timestamp_field, -1);
        assert_eq!(config, CsvConfig::with_query_field(2));
    }

    #[test]
    fn test_csv_config_requires_query_field() {
        assert!(toml::from_str::<CsvConfig>("header = true").is_err());
    }

    #[test]
    fn test_csv_config_rejects_negative_query_field() {
        let config = CsvConfig::with_query_field(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_csv_config_rejects_bad_optional_index() {
        let mut config = CsvConfig::with_query_field(0);
        config.rows_sent_field = -2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_config_partial() {
        let config: SummaryConfig = toml::from_str("hot_query_limit = 3").unwrap();
        assert_eq!(config.hot_query_limit, 3);
        assert_eq!(config.significant_change_threshold, 10.0);
    }
}
