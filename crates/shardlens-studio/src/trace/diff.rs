//! Comparison of two trace runs.
//!
//! Handles the math for per-metric changes, including division by zero:
//! a zero baseline yields an infinite change, two zeros yield NaN.

use super::schema::TraceQuery;
use super::summary::{summarize_trace, QuerySummary};
use serde::Serialize;
use std::collections::HashMap;

/// Change of one metric between two runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricChange {
    pub before: u64,
    pub after: u64,
    pub diff: i64,
    /// `diff / before * 100`; infinite when only `before` is zero, NaN when both are
    pub pct: f64,
}

impl MetricChange {
    pub fn new(before: u64, after: u64) -> Self {
        let diff = after as i64 - before as i64;
        Self {
            before,
            after,
            diff,
            pct: diff as f64 / before as f64 * 100.0,
        }
    }

    /// Percent change with non-finite values counted as zero
    pub fn finite_pct(&self) -> f64 {
        if self.pct.is_finite() {
            self.pct
        } else {
            0.0
        }
    }
}

/// Render a percent change as `x.xx%`, `∞%` or `NaN%`
pub fn format_pct(pct: f64) -> String {
    if pct.is_nan() {
        "NaN%".to_string()
    } else if pct.is_infinite() {
        if pct > 0.0 {
            "∞%".to_string()
        } else {
            "-∞%".to_string()
        }
    } else {
        format!("{:.2}%", pct)
    }
}

/// One query present in both runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDiff {
    pub query: String,
    pub line_number: String,
    pub changes: [MetricChange; 4],
    /// Per metric: improved by more than the threshold
    pub improved: [bool; 4],
    pub significant: bool,
}

impl QueryDiff {
    /// Mean percent change over the four metrics
    pub fn average_pct(&self) -> f64 {
        self.changes.iter().map(|c| c.finite_pct()).sum::<f64>() / self.changes.len() as f64
    }
}

/// Full comparison of two runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceDiff {
    /// In the first run's order
    pub queries: Vec<QueryDiff>,
    pub totals_before: QuerySummary,
    pub totals_after: QuerySummary,
    /// Percent change of the summed metrics
    pub aggregate: [MetricChange; 4],
    pub threshold: f64,
}

impl TraceDiff {
    pub fn significant_count(&self) -> usize {
        self.queries.iter().filter(|q| q.significant).count()
    }
}

fn changes(before: &QuerySummary, after: &QuerySummary) -> [MetricChange; 4] {
    let b = before.metrics();
    let a = after.metrics();
    [0, 1, 2, 3].map(|i| MetricChange::new(b[i], a[i]))
}

/// Compare two runs of the same workload
///
/// # Arguments
/// * `first` - Baseline run
/// * `second` - Run compared against the baseline
/// * `threshold` - Improvement (percent) beyond which a query is significant
///
/// # Returns
/// Per-query changes for queries present in both runs, plus aggregate changes.
/// Queries missing from either side are dropped.
pub fn diff_traces(first: &[TraceQuery], second: &[TraceQuery], threshold: f64) -> TraceDiff {
    let mut by_text: HashMap<&str, &TraceQuery> = HashMap::new();
    for q in second {
        by_text.entry(q.query.as_str()).or_insert(q);
    }

    let mut totals_before = QuerySummary::default();
    let mut totals_after = QuerySummary::default();
    let mut queries = Vec::new();

    for q1 in first {
        let Some(q2) = by_text.get(q1.query.as_str()) else {
            continue;
        };

        let before = summarize_trace(&q1.trace);
        let after = summarize_trace(&q2.trace);
        totals_before.add(&before);
        totals_after.add(&after);

        let changes = changes(&before, &after);
        // Every metric is evaluated before the flags are combined
        let improved = changes.map(|c| c.pct < -threshold);
        let significant = improved.iter().any(|&i| i);

        queries.push(QueryDiff {
            query: q1.query.clone(),
            line_number: q1.line_number.clone(),
            changes,
            improved,
            significant,
        });
    }

    TraceDiff {
        aggregate: changes(&totals_before, &totals_after),
        queries,
        totals_before,
        totals_after,
        threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceNode;

    fn query(text: &str, shards: u64) -> TraceQuery {
        TraceQuery {
            query: text.to_string(),
            line_number: "1".to_string(),
            trace: TraceNode::leaf("Route", "Scatter", 1, 16.0, shards),
        }
    }

    #[test]
    fn test_percent_formatting() {
        assert_eq!(format_pct(MetricChange::new(8, 7).pct), "-12.50%");
        assert_eq!(format_pct(MetricChange::new(0, 3).pct), "∞%");
        assert_eq!(format_pct(MetricChange::new(0, 0).pct), "NaN%");
        assert_eq!(format_pct(MetricChange::new(4, 4).pct), "0.00%");
    }

    #[test]
    fn test_shard_reduction_is_significant() {
        let diff = diff_traces(
            &[query("select * from music", 8)],
            &[query("select * from music", 7)],
            10.0,
        );
        assert_eq!(diff.queries.len(), 1);
        let q = &diff.queries[0];
        assert_eq!(q.changes[3].diff, -1);
        assert_eq!(format_pct(q.changes[3].pct), "-12.50%");
        assert_eq!(q.improved, [false, false, false, true]);
        assert!(q.significant);
        assert_eq!(diff.significant_count(), 1);
    }

    #[test]
    fn test_unmatched_queries_are_dropped() {
        let diff = diff_traces(
            &[query("a", 8), query("b", 8)],
            &[query("b", 8), query("c", 8)],
            10.0,
        );
        assert_eq!(diff.queries.len(), 1);
        assert_eq!(diff.queries[0].query, "b");
    }

    #[test]
    fn test_empty_side() {
        let diff = diff_traces(&[query("a", 8)], &[], 10.0);
        assert!(diff.queries.is_empty());
        assert!(diff.aggregate.iter().all(|c| c.pct.is_nan()));
    }

    #[test]
    fn test_swapping_inputs_negates_diffs() {
        let forward = diff_traces(&[query("a", 8)], &[query("a", 6)], 10.0);
        let backward = diff_traces(&[query("a", 6)], &[query("a", 8)], 10.0);
        for (f, b) in forward.aggregate.iter().zip(backward.aggregate.iter()) {
            assert_eq!(f.diff, -b.diff);
        }
    }

    #[test]
    fn test_average_ignores_infinite() {
        let mut before = query("a", 8);
        before.trace.avg_rows = 0.0;
        let diff = diff_traces(&[before], &[query("a", 8)], 10.0);
        let q = &diff.queries[0];
        assert!(q.changes[1].pct.is_infinite());
        assert_eq!(q.average_pct(), 0.0);
    }
}
