//! Pull-based workload loaders.
//!
//! Every loader turns one textual source into a lazy sequence of [`Record`]s:
//! - SQL scripts with `--` directives
//! - MySQL slow-query logs
//! - MySQL general query logs
//! - Query-router (gateway) logs
//! - CSV exports
//!
//! Loaders read at most one record ahead. A fatal error ends the sequence and
//! is reported once by [`Loader::close`].

pub mod csv_log;
pub mod directive;
pub mod gateway_log;
pub mod general_log;
pub mod record;
pub mod slow_log;
pub mod source;
pub mod sql_script;

pub use csv_log::CsvLoader;
pub use directive::{Directive, Scope};
pub use gateway_log::GatewayLogLoader;
pub use general_log::GeneralLogLoader;
pub use record::{first_word, QueryKind, QueryMetrics, Record};
pub use slow_log::SlowQueryLogLoader;
pub use sql_script::SqlScriptLoader;

use crate::utils::config::CsvConfig;
use crate::utils::error::LoadError;
use log::debug;

/// A record stream with a terminal error report
pub trait Loader: Iterator<Item = Record> {
    /// Release the source and surface the failure that stopped the stream, if any
    fn close(&mut self) -> Result<(), LoadError>;
}

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputType {
    /// SQL script with `--` directives
    Sql,
    /// MySQL slow-query log
    SlowLog,
    /// MySQL general query log
    GeneralLog,
    /// Query-router (gateway) query log
    GatewayLog,
    /// CSV export
    Csv,
}

/// Format-specific loader settings
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Gateway logs: write bind variables back into the statement
    pub bind_variables: bool,

    /// CSV exports: column mapping (required for `InputType::Csv`)
    pub csv: Option<CsvConfig>,
}

/// Open a loader for a file path or URL
///
/// # Errors
/// * `LoadError::Io` / `LoadError::Fetch` - the source cannot be opened
/// * `LoadError::Config` - CSV input without a valid column mapping
pub fn open_loader(
    input_type: InputType,
    source: &str,
    options: &LoaderOptions,
) -> Result<Box<dyn Loader>, LoadError> {
    debug!("Opening {:?} loader for {}", input_type, source);

    let loader: Box<dyn Loader> = match input_type {
        InputType::Sql => Box::new(SqlScriptLoader::open(source)?),
        InputType::SlowLog => Box::new(SlowQueryLogLoader::open(source)?),
        InputType::GeneralLog => Box::new(GeneralLogLoader::open(source)?),
        InputType::GatewayLog => Box::new(GatewayLogLoader::open(source, options.bind_variables)?),
        InputType::Csv => {
            let config = options.csv.clone().ok_or_else(|| {
                crate::utils::error::ConfigError::Invalid(
                    "CSV input requires a column configuration".to_string(),
                )
            })?;
            Box::new(CsvLoader::open(source, config)?)
        }
    };

    Ok(loader)
}
