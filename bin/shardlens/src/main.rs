//! Shardlens CLI
//!
//! Workload analysis for sharded SQL routing layers.
//! Extracts sharding-relevant keys and transaction patterns from query logs,
//! and summarizes or compares the resulting artifacts.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use shardlens_studio::commands::{
    display_version, execute_keys, execute_summarize, execute_transactions, KeysArgs,
    SummarizeArgs, TransactionsArgs,
};
use shardlens_studio::loader::InputType;
use shardlens_studio::utils::config::KeysConfig;

/// Shardlens - workload analysis for sharded SQL
#[derive(Parser, Debug)]
#[command(name = "shardlens")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract tables, filter columns and join predicates from a workload
    Keys {
        /// Workload file path or http(s) URL
        #[arg(short, long)]
        input: String,

        /// Workload format
        #[arg(short = 't', long, value_enum, default_value = "sql")]
        input_type: InputType,

        /// Output path for the keys artifact (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML column mapping for CSV input
        #[arg(long)]
        csv_config: Option<PathBuf>,

        /// Substitute gateway bind variables into the statements
        #[arg(long)]
        bind_variables: bool,

        /// Major version of a binary, e.g. `mysql=8` (repeatable)
        #[arg(long = "binary-version", value_parser = parse_binary_version)]
        binary_versions: Vec<(String, u32)>,
    },

    /// Find recurring transaction patterns in a workload
    Transactions {
        /// Workload file path or http(s) URL
        #[arg(short, long)]
        input: String,

        /// Workload format
        #[arg(short = 't', long, value_enum, default_value = "slow-log")]
        input_type: InputType,

        /// Output path for the transactions artifact (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML column mapping for CSV input
        #[arg(long)]
        csv_config: Option<PathBuf>,
    },

    /// Summarize an artifact, or compare two trace artifacts
    Summarize {
        /// Artifact files
        #[arg(required = true, num_args = 1..=2)]
        files: Vec<PathBuf>,

        /// Summary configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Percent change that counts as significant in trace comparisons
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of hot queries to list in keys summaries
        #[arg(long)]
        hot_queries: Option<usize>,
    },

    /// Display version information
    Version,
}

fn parse_binary_version(raw: &str) -> Result<(String, u32), String> {
    let (name, version) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VERSION, got '{}'", raw))?;
    let version = version
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid major version '{}'", version))?;
    Ok((name.trim().to_string(), version))
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Keys {
            input,
            input_type,
            output,
            csv_config,
            bind_variables,
            binary_versions,
        } => {
            let args = KeysArgs {
                input,
                input_type,
                output,
                csv_config,
                bind_variables,
                keys_config: KeysConfig {
                    versions: binary_versions.into_iter().collect(),
                },
            };
            execute_keys(args)?;
        }

        Commands::Transactions {
            input,
            input_type,
            output,
            csv_config,
        } => {
            execute_transactions(TransactionsArgs {
                input,
                input_type,
                output,
                csv_config,
            })?;
        }

        Commands::Summarize {
            files,
            config,
            threshold,
            hot_queries,
        } => {
            execute_summarize(SummarizeArgs {
                files,
                config_file: config,
                threshold_percent: threshold,
                hot_queries,
            })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
