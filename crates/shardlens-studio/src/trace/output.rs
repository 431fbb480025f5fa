//! Terminal output rendering for trace summaries and comparisons.
//!
//! Provides human-readable reports with visual cues (emojis) for
//! improvements and regressions.

use super::diff::{format_pct, MetricChange, QueryDiff, TraceDiff};
use super::summary::{QuerySummary, TracedQuerySummary, METRIC_NAMES};
use colored::*;

const RULE: &str = "---------------------------------------------------\n";

/// Render the per-query metrics of one run
pub fn render_trace_summary(queries: &[TracedQuerySummary]) -> String {
    let mut out = String::new();
    out.push_str("\n📊 ");
    out.push_str(&"Trace Summary".bold().to_string());
    out.push('\n');
    out.push_str(RULE);

    let mut totals = QuerySummary::default();
    for q in queries {
        out.push_str(&render_query_header(&q.query, &q.line_number));
        for (name, value) in METRIC_NAMES.iter().zip(q.summary.metrics()) {
            out.push_str(&format!("  {:<16} {}\n", format!("{}:", name), value));
        }
        out.push('\n');
        totals.add(&q.summary);
    }

    out.push_str(RULE);
    out.push_str(&format!("Queries: {}\n", queries.len()));
    for (name, value) in METRIC_NAMES.iter().zip(totals.metrics()) {
        out.push_str(&format!("  Total {:<16} {}\n", format!("{}:", name), value));
    }
    out
}

/// Render a comparison of two runs
pub fn render_trace_diff(diff: &TraceDiff) -> String {
    let mut out = String::new();
    out.push_str("\n📊 ");
    out.push_str(&"Trace Comparison".bold().to_string());
    out.push('\n');
    out.push_str(RULE);

    for q in &diff.queries {
        out.push_str(&render_query_diff(q));
    }

    out.push_str(RULE);
    out.push_str(&render_aggregate(diff));
    out
}

fn render_query_header(query: &str, line_number: &str) -> String {
    format!("{} {} (line {})\n", "Query:".bold(), query, line_number)
}

fn render_query_diff(q: &QueryDiff) -> String {
    let mut out = render_query_header(&q.query, &q.line_number);
    out.push_str(&format!(
        "  {:<16} {:>10} {:>10} {:>8} {:>10}\n",
        "Metric", "Before", "After", "Diff", "Change"
    ));

    for ((name, change), improved) in METRIC_NAMES.iter().zip(&q.changes).zip(q.improved) {
        out.push_str(&render_change_row(name, change, improved));
    }

    out.push_str(&format!(
        "  {:<16} {}\n",
        "Average Change:",
        format_pct(q.average_pct())
    ));

    if q.significant {
        out.push_str(&format!("  {}\n", "✅ Significant improvement".green().bold()));
    }
    out.push('\n');
    out
}

fn render_change_row(name: &str, change: &MetricChange, improved: bool) -> String {
    let pct = format!("{:>10}", format_pct(change.pct));
    let pct = if improved {
        pct.green().to_string()
    } else if change.pct > 0.0 {
        pct.red().to_string()
    } else {
        pct
    };

    format!(
        "{} {:<16} {:>10} {:>10} {:>+8} {}\n",
        get_delta_symbol(change.diff),
        name,
        change.before,
        change.after,
        change.diff,
        pct
    )
}

fn render_aggregate(diff: &TraceDiff) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} ({} queries compared, {} significant at {:.2}%)\n",
        "Summary".bold(),
        diff.queries.len(),
        diff.significant_count(),
        diff.threshold
    ));

    // Labelled as an average, computed over the summed metrics
    for (name, change) in METRIC_NAMES.iter().zip(&diff.aggregate) {
        out.push_str(&format!(
            "  Average {} Change: {} ({} -> {})\n",
            name,
            format_pct(change.pct),
            change.before,
            change.after
        ));
    }
    out
}

fn get_delta_symbol(change: i64) -> &'static str {
    if change > 0 {
        "📈"
    } else if change < 0 {
        "📉"
    } else {
        "➡️"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{diff_traces, summarize_queries, TraceNode, TraceQuery};

    fn query(text: &str, shards: u64) -> TraceQuery {
        TraceQuery {
            query: text.to_string(),
            line_number: "1".to_string(),
            trace: TraceNode::leaf("Route", "Scatter", 1, 16.0, shards),
        }
    }

    #[test]
    fn test_summary_lists_every_metric() {
        colored::control::set_override(false);
        let text = render_trace_summary(&summarize_queries(&[query("select * from music", 8)]));
        assert!(text.contains("select * from music"));
        assert!(text.contains("Shards Queried:"));
        assert!(text.contains("Queries: 1"));
    }

    #[test]
    fn test_diff_marks_significant_queries() {
        colored::control::set_override(false);
        let diff = diff_traces(&[query("q", 8)], &[query("q", 7)], 10.0);
        let text = render_trace_diff(&diff);
        assert!(text.contains("-12.50%"));
        assert!(text.contains("Significant improvement"));
        assert!(text.contains("Average Shards Queried Change: -12.50%"));
    }

    #[test]
    fn test_empty_diff_reports_zero_queries() {
        colored::control::set_override(false);
        let diff = diff_traces(&[], &[query("q", 7)], 10.0);
        let text = render_trace_diff(&diff);
        assert!(text.contains("0 queries compared"));
    }
}
