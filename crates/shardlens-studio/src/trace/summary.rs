//! Per-query trace metrics.

use super::schema::{TraceNode, TraceQuery};
use serde::Serialize;

/// Display names of the four metrics, in [`QuerySummary::metrics`] order
pub const METRIC_NAMES: [&str; 4] = [
    "Route Calls",
    "Rows Sent",
    "Rows In Memory",
    "Shards Queried",
];

/// Workload metrics of one traced query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub route_calls: u64,
    pub rows_sent: u64,
    pub rows_in_memory: u64,
    pub shards_queried: u64,
}

impl QuerySummary {
    pub fn metrics(&self) -> [u64; 4] {
        [
            self.route_calls,
            self.rows_sent,
            self.rows_in_memory,
            self.shards_queried,
        ]
    }

    pub fn add(&mut self, other: &QuerySummary) {
        self.route_calls += other.route_calls;
        self.rows_sent += other.rows_sent;
        self.rows_in_memory += other.rows_in_memory;
        self.shards_queried += other.shards_queried;
    }
}

/// A summarized query in input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracedQuerySummary {
    pub query: String,
    pub line_number: String,
    pub summary: QuerySummary,
}

fn rounded(value: f64) -> u64 {
    value.round().max(0.0) as u64
}

/// Walk a trace tree and collect its metrics
///
/// # Example
/// ```ignore
/// let summary = summarize_trace(&query.trace);
/// println!("{} shards", summary.shards_queried);
/// ```
pub fn summarize_trace(root: &TraceNode) -> QuerySummary {
    let mut summary = QuerySummary::default();
    visit(root, &mut summary);
    summary
}

fn visit(node: &TraceNode, summary: &mut QuerySummary) {
    for input in &node.inputs {
        visit(input, summary);
    }

    summary.shards_queried += node.shards_queried;

    match (node.operator_type.as_str(), node.variant.as_str()) {
        ("Route", _) => {
            summary.route_calls += node.calls;
            summary.rows_sent += rounded(node.avg_rows * node.calls as f64);
        }
        ("Sort", "Memory") => {
            summary.rows_in_memory += rounded(node.avg_rows);
        }
        ("Join", "HashJoin") => {
            // The left input is fully buffered
            if let Some(left) = node.inputs.first() {
                summary.rows_in_memory += rounded(left.avg_rows * left.calls as f64);
            }
        }
        _ => {}
    }
}

/// Summarize every query, keeping input order
pub fn summarize_queries(queries: &[TraceQuery]) -> Vec<TracedQuerySummary> {
    queries
        .iter()
        .map(|q| TracedQuerySummary {
            query: q.query.clone(),
            line_number: q.line_number.clone(),
            summary: summarize_trace(&q.trace),
        })
        .collect()
}
