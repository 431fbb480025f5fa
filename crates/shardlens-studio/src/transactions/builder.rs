//! Per-connection transaction buffering.

use super::schema::{QueryShape, TransactionsArtifact};
use super::shape::{extract_shape, ValueDictionary};
use super::signature::SignatureSet;
use crate::loader::Record;
use crate::output::FileType;
use crate::sql::StatementType;
use log::{debug, info};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct OpenTransaction {
    shapes: Vec<QueryShape>,
    values: ValueDictionary,
}

/// Groups statements into transactions per connection and counts their signatures
#[derive(Debug)]
pub struct TransactionBuilder {
    autocommit: bool,
    open: HashMap<u64, OpenTransaction>,
    signatures: SignatureSet,
    emitted: usize,
    unparsed: usize,
}

impl TransactionBuilder {
    /// `autocommit` decides what a statement outside an explicit transaction means
    pub fn new(autocommit: bool) -> Self {
        Self {
            autocommit,
            open: HashMap::new(),
            signatures: SignatureSet::new(),
            emitted: 0,
            unparsed: 0,
        }
    }

    pub fn process(&mut self, record: &Record) {
        if !record.is_sql() {
            return;
        }

        let connection = record.connection_id();
        let word = record.first_word.to_ascii_uppercase();

        match word.as_str() {
            "BEGIN" | "START" => {
                // A new BEGIN implicitly commits what is open
                self.commit(connection);
                self.open.insert(connection, OpenTransaction::default());
            }
            "COMMIT" => self.commit(connection),
            "ROLLBACK" => {
                if self.open.remove(&connection).is_some() {
                    debug!("Rolled back transaction on connection {}", connection);
                }
            }
            _ => self.statement(connection, &word, record),
        }
    }

    fn statement(&mut self, connection: u64, word: &str, record: &Record) {
        let kind = StatementType::from_first_word(word);

        if kind == StatementType::Ddl {
            self.commit(connection);
            return;
        }
        if !kind.is_dml() && !kind.is_read() {
            return;
        }

        if !self.open.contains_key(&connection) {
            if self.autocommit {
                if kind.is_read() {
                    return;
                }
                let mut values = ValueDictionary::default();
                if let Some(shape) = self.shape(record, &mut values) {
                    self.emit(vec![shape]);
                }
                return;
            }
            self.open.insert(connection, OpenTransaction::default());
        }

        let Some(mut txn) = self.open.remove(&connection) else {
            return;
        };
        if let Some(shape) = self.shape(record, &mut txn.values) {
            txn.shapes.push(shape);
        }
        self.open.insert(connection, txn);
    }

    fn shape(&mut self, record: &Record, values: &mut ValueDictionary) -> Option<QueryShape> {
        match extract_shape(&record.query_text, values) {
            Ok(shape) => shape,
            Err(e) => {
                debug!("Line {}: {}", record.line_number, e);
                self.unparsed += 1;
                None
            }
        }
    }

    fn commit(&mut self, connection: u64) {
        if let Some(txn) = self.open.remove(&connection) {
            if !txn.shapes.is_empty() {
                self.emit(txn.shapes);
            }
        }
    }

    fn emit(&mut self, shapes: Vec<QueryShape>) {
        self.emitted += 1;
        self.signatures.add(shapes);
    }

    /// Drop unfinished transactions and build the artifact
    pub fn finish(self) -> TransactionsArtifact {
        if !self.open.is_empty() {
            debug!(
                "Discarding {} transactions left open at end of input",
                self.open.len()
            );
        }

        info!(
            "Collected {} transactions into {} signatures ({} statements not parsed)",
            self.emitted,
            self.signatures.len(),
            self.unparsed
        );

        TransactionsArtifact {
            file_type: FileType::Transactions,
            signatures: self.signatures.into_repeated(),
        }
    }
}
