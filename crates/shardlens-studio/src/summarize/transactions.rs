//! Transactions report.

use crate::transactions::{Predicate, QueryShape, TransactionsArtifact};
use colored::*;

fn render_value(val: i64) -> String {
    if val < 0 {
        "?".to_string()
    } else {
        format!(":{}", val)
    }
}

fn render_predicate(p: &Predicate) -> String {
    format!("{}.{} {} {}", p.table, p.col, p.op, render_value(p.val))
}

fn render_shape(index: usize, shape: &QueryShape) -> String {
    let mut line = format!("  {}. {} {}", index + 1, shape.op, shape.affected_table);
    if !shape.updated_columns.is_empty() {
        line.push_str(&format!(" SET {}", shape.updated_columns.join(", ")));
    }
    if !shape.predicates.is_empty() {
        let predicates: Vec<String> = shape.predicates.iter().map(render_predicate).collect();
        line.push_str(&format!(" WHERE {}", predicates.join(" AND ")));
    }
    line.push('\n');
    line
}

/// Render every repeated signature with its shapes
///
/// Anonymized values print as `?`; values shared inside a transaction print as `:N`.
pub fn render_transactions_summary(artifact: &TransactionsArtifact) -> String {
    let mut out = String::new();
    out.push_str("\n🔁 ");
    out.push_str(&"Transaction Signatures".bold().to_string());
    out.push_str("\n---------------------------------------------------\n");

    if artifact.signatures.is_empty() {
        out.push_str("No repeated transactions found\n");
        return out;
    }

    for (i, signature) in artifact.signatures.iter().enumerate() {
        out.push_str(&format!(
            "{} (seen {} times, {} statements)\n",
            format!("Signature #{}", i + 1).bold(),
            signature.count,
            signature.queries.len()
        ));
        for (j, shape) in signature.queries.iter().enumerate() {
            out.push_str(&render_shape(j, shape));
        }
        out.push('\n');
    }
    out
}
