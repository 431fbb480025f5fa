//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod keys;
pub mod models;
pub mod summarize;
pub mod transactions;
pub mod utils;

// Re-export main command functions
pub use keys::{execute_keys, validate_keys_args};
pub use models::{KeysArgs, SummarizeArgs, TransactionsArgs};
pub use summarize::execute_summarize;
pub use transactions::execute_transactions;
pub use utils::display_version;
