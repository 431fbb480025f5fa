use crate::loader::{InputType, LoaderOptions};
use crate::utils::config::{KeysConfig, SummaryConfig};
use std::path::PathBuf;

/// Arguments for the keys command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct KeysArgs {
    /// Workload file path or URL
    pub input: String,

    /// Format of the workload
    pub input_type: InputType,

    /// Where to write the keys artifact (stdout when absent)
    pub output: Option<PathBuf>,

    /// TOML column mapping, required for CSV input
    pub csv_config: Option<PathBuf>,

    /// Gateway logs: substitute bind variables into the statements
    pub bind_variables: bool,

    /// Versions consulted by `skip_if_below_version`
    pub keys_config: KeysConfig,
}

impl Default for KeysArgs {
    fn default() -> Self {
        Self {
            input: String::new(),
            input_type: InputType::Sql,
            output: None,
            csv_config: None,
            bind_variables: false,
            keys_config: KeysConfig::default(),
        }
    }
}

/// Arguments for the transactions command
#[derive(Debug, Clone)]
pub struct TransactionsArgs {
    pub input: String,
    pub input_type: InputType,
    pub output: Option<PathBuf>,
    pub csv_config: Option<PathBuf>,
}

impl Default for TransactionsArgs {
    fn default() -> Self {
        Self {
            input: String::new(),
            input_type: InputType::SlowLog,
            output: None,
            csv_config: None,
        }
    }
}

/// Arguments for the summarize command
#[derive(Debug, Clone, Default)]
pub struct SummarizeArgs {
    /// One artifact, or two trace artifacts to compare
    pub files: Vec<PathBuf>,

    /// Optional summary configuration file (TOML)
    pub config_file: Option<PathBuf>,

    /// Overrides the significance threshold of the configuration
    pub threshold_percent: Option<f64>,

    /// Overrides the hot-query limit of the configuration
    pub hot_queries: Option<usize>,
}

impl SummarizeArgs {
    pub(crate) fn summary_config(&self) -> anyhow::Result<SummaryConfig> {
        use anyhow::Context;

        let mut config = match &self.config_file {
            Some(path) => crate::utils::config::load_summary_config(path)
                .with_context(|| format!("Failed to load summary config {}", path.display()))?,
            None => SummaryConfig::default(),
        };
        if let Some(threshold) = self.threshold_percent {
            config.significant_change_threshold = threshold;
        }
        if let Some(limit) = self.hot_queries {
            config.hot_query_limit = limit;
        }
        Ok(config)
    }
}

/// Build loader options, reading the CSV mapping when one is given
pub(crate) fn loader_options(
    csv_config: Option<&PathBuf>,
    bind_variables: bool,
) -> anyhow::Result<LoaderOptions> {
    use anyhow::Context;

    let csv = match csv_config {
        Some(path) => Some(
            crate::utils::config::load_csv_config(path)
                .with_context(|| format!("Failed to load CSV config {}", path.display()))?,
        ),
        None => None,
    };

    Ok(LoaderOptions {
        bind_variables,
        csv,
    })
}
