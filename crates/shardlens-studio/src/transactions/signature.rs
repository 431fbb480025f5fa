//! Signature clustering and anonymization.

use super::schema::{QueryShape, SignatureCount};
use std::collections::HashMap;
use std::fmt::Write;
use xxhash_rust::xxh3::xxh3_64;

/// 64-bit hash over the ordered shapes of a transaction
pub fn signature_hash(queries: &[QueryShape]) -> u64 {
    let mut text = String::new();
    for shape in queries {
        let _ = write!(
            text,
            "{}|{}|{}|",
            shape.op,
            shape.affected_table,
            shape.updated_columns.join(",")
        );
        for p in &shape.predicates {
            let _ = write!(text, "{}.{} {:?} {};", p.table, p.col, p.op, p.val);
        }
        text.push('\n');
    }
    xxh3_64(text.as_bytes())
}

/// Distinct signatures with their counts, in first-seen order
#[derive(Debug, Default)]
pub struct SignatureSet {
    entries: Vec<SignatureCount>,
    buckets: HashMap<u64, Vec<usize>>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished transaction
    pub fn add(&mut self, queries: Vec<QueryShape>) {
        let hash = signature_hash(&queries);
        let entries = &mut self.entries;
        let bucket = self.buckets.entry(hash).or_default();

        // Equal hashes are confirmed field by field; a collision starts a new entry
        match bucket.iter().find(|&&i| entries[i].queries == queries) {
            Some(&i) => entries[i].count += 1,
            None => {
                entries.push(SignatureCount { count: 1, queries });
                bucket.push(entries.len() - 1);
            }
        }
    }

    /// Number of distinct signatures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Repeated signatures, anonymized, descending by count (ties keep first-seen order)
    pub fn into_repeated(self) -> Vec<SignatureCount> {
        let mut repeated: Vec<SignatureCount> = self
            .entries
            .into_iter()
            .filter(|s| s.count > 1)
            .map(|mut s| {
                anonymize(&mut s.queries);
                s
            })
            .collect();
        repeated.sort_by(|a, b| b.count.cmp(&a.count));
        repeated
    }
}

/// Replace slots used once with `-1` and renumber the rest densely in encounter order
pub fn anonymize(queries: &mut [QueryShape]) {
    let mut uses: HashMap<i64, usize> = HashMap::new();
    for p in queries.iter().flat_map(|q| q.predicates.iter()) {
        *uses.entry(p.val).or_default() += 1;
    }

    let mut dense: HashMap<i64, i64> = HashMap::new();
    let mut next = 0;
    for p in queries.iter_mut().flat_map(|q| q.predicates.iter_mut()) {
        p.val = if uses.get(&p.val).copied().unwrap_or(0) <= 1 {
            -1
        } else {
            *dense.entry(p.val).or_insert_with(|| {
                let slot = next;
                next += 1;
                slot
            })
        };
    }
}
