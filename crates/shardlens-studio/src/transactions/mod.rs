//! Transaction signature clustering.
//!
//! Statements are grouped per connection into transactions, each transaction
//! is reduced to a signature of query shapes, and equal signatures are
//! counted. Only signatures seen more than once are reported.

pub mod builder;
pub mod schema;
pub mod shape;
pub mod signature;

pub use builder::TransactionBuilder;
pub use schema::{Predicate, QueryShape, SignatureCount, TransactionsArtifact};
pub use shape::{extract_shape, ValueDictionary};
pub use signature::{anonymize, signature_hash, SignatureSet};

use crate::loader::{Loader, Record};
use crate::utils::config::AUTOCOMMIT_SCAN_LIMIT;
use crate::utils::error::LoadError;
use log::debug;

/// Autocommit is assumed unless an explicit `BEGIN` or `START TRANSACTION` shows up
pub fn infer_autocommit(records: &[Record]) -> bool {
    !records.iter().any(|r| {
        r.is_sql()
            && (r.first_word.eq_ignore_ascii_case("begin")
                || r.first_word.eq_ignore_ascii_case("start"))
    })
}

/// Run the transaction builder over a whole loader
///
/// The first records are buffered to infer autocommit, then replayed.
///
/// # Errors
/// Loader failures reported by `close`
pub fn analyze_transactions<L: Loader + ?Sized>(
    loader: &mut L,
) -> Result<TransactionsArtifact, LoadError> {
    let mut head = Vec::with_capacity(AUTOCOMMIT_SCAN_LIMIT);
    while head.len() < AUTOCOMMIT_SCAN_LIMIT {
        match loader.next() {
            Some(record) => head.push(record),
            None => break,
        }
    }

    let autocommit = infer_autocommit(&head);
    debug!(
        "Autocommit inferred as {} from {} records",
        autocommit,
        head.len()
    );

    let mut builder = TransactionBuilder::new(autocommit);
    for record in &head {
        builder.process(record);
    }
    drop(head);

    while let Some(record) = loader.next() {
        builder.process(&record);
    }
    loader.close()?;

    Ok(builder.finish())
}
