//! Shardlens Studio library
//!
//! Workload loaders, SQL key extraction, transaction signatures and
//! artifact summaries. The modules are exposed for the CLI and for testing.

pub mod commands;
pub mod keys;
pub mod loader;
pub mod output;
pub mod sql;
pub mod summarize;
pub mod trace;
pub mod transactions;
pub mod utils;
