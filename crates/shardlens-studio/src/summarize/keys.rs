//! Keys summary: per-table read/write counts and column usage.

use crate::keys::{KeysArtifact, QueryAnalysisResult, QueryFailure};
use crate::sql::{ColumnRef, JoinPredicate};
use crate::utils::config::SummaryConfig;
use colored::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Role a column plays in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Position {
    Join,
    JoinRange,
    Where,
    WhereRange,
    Grouping,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Join => "JOIN",
            Self::JoinRange => "JOIN RANGE",
            Self::Where => "WHERE",
            Self::WhereRange => "WHERE RANGE",
            Self::Grouping => "GROUP",
        };
        f.write_str(s)
    }
}

/// Usage of one column in one position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnUsage {
    pub column: String,
    pub position: Position,
    pub count: usize,
    /// `count * 100 / (read_query_count + write_query_count)`
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub read_query_count: usize,
    pub write_query_count: usize,
    /// By position, then descending count
    pub columns: Vec<ColumnUsage>,
    pub join_predicates: Vec<JoinPredicate>,
}

impl TableSummary {
    pub fn use_count(&self) -> usize {
        self.read_query_count + self.write_query_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotQuery {
    pub query: String,
    pub usage_count: usize,
    pub query_time: f64,
    pub first_line: usize,
}

/// Two tables joined by at least one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinEdge {
    pub left: String,
    pub right: String,
    pub queries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeysSummary {
    /// Descending by use count
    pub tables: Vec<TableSummary>,
    pub hot_queries: Vec<HotQuery>,
    pub join_graph: Vec<JoinEdge>,
    pub reference_tables: Vec<String>,
    pub failures: Vec<QueryFailure>,
}

#[derive(Default)]
struct TableAccumulator {
    reads: usize,
    writes: usize,
    columns: BTreeMap<(String, Position), usize>,
    join_predicates: Vec<JoinPredicate>,
}

fn column_positions(q: &QueryAnalysisResult) -> BTreeSet<(ColumnRef, Position)> {
    let mut positions = BTreeSet::new();

    for f in &q.filter_columns {
        let position = if f.op.is_range() {
            Position::WhereRange
        } else {
            Position::Where
        };
        positions.insert((f.column.clone(), position));
    }

    for p in &q.join_predicates {
        let position = if p.op.is_range() {
            Position::JoinRange
        } else {
            Position::Join
        };
        positions.insert((p.lhs.clone(), position));
        positions.insert((p.rhs.clone(), position));
    }

    for g in &q.grouping_columns {
        positions.insert((g.clone(), Position::Grouping));
    }

    positions
}

/// Build the keys summary
///
/// Every query counts `usage_count` times. A query counts once per column
/// and position even when it repeats the column.
pub fn summarize_keys(artifact: &KeysArtifact, config: &SummaryConfig) -> KeysSummary {
    let mut tables: HashMap<String, TableAccumulator> = HashMap::new();
    let mut edges: BTreeMap<(String, String), usize> = BTreeMap::new();

    for q in &artifact.queries {
        let weight = q.usage_count;

        for table in &q.table_names {
            let acc = tables.entry(table.clone()).or_default();
            if q.statement_type.is_read() {
                acc.reads += weight;
            } else {
                acc.writes += weight;
            }
        }

        for (column, position) in column_positions(q) {
            *tables
                .entry(column.table)
                .or_default()
                .columns
                .entry((column.name, position))
                .or_default() += weight;
        }

        let mut pairs = BTreeSet::new();
        for p in &q.join_predicates {
            let ordered = p.ordered();
            pairs.insert((ordered.lhs.table.clone(), ordered.rhs.table.clone()));
            for table in [&p.lhs.table, &p.rhs.table] {
                let acc = tables.entry(table.clone()).or_default();
                if !acc.join_predicates.contains(&ordered) {
                    acc.join_predicates.push(ordered.clone());
                }
            }
        }
        for pair in pairs {
            *edges.entry(pair).or_default() += weight;
        }
    }

    let mut summaries: Vec<TableSummary> = tables
        .into_iter()
        .map(|(table, acc)| {
            let total = acc.reads + acc.writes;
            let mut columns: Vec<ColumnUsage> = acc
                .columns
                .into_iter()
                .map(|((column, position), count)| ColumnUsage {
                    column,
                    position,
                    count,
                    percentage: if total == 0 {
                        0.0
                    } else {
                        count as f64 * 100.0 / total as f64
                    },
                })
                .collect();
            columns.sort_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then(b.count.cmp(&a.count))
                    .then(a.column.cmp(&b.column))
            });

            TableSummary {
                table,
                read_query_count: acc.reads,
                write_query_count: acc.writes,
                columns,
                join_predicates: acc.join_predicates,
            }
        })
        .collect();
    summaries.sort_by(|a, b| b.use_count().cmp(&a.use_count()).then(a.table.cmp(&b.table)));

    let mut join_graph: Vec<JoinEdge> = edges
        .into_iter()
        .map(|((left, right), queries)| JoinEdge {
            left,
            right,
            queries,
        })
        .collect();
    join_graph.sort_by(|a, b| b.queries.cmp(&a.queries));

    KeysSummary {
        tables: summaries,
        hot_queries: hot_queries(&artifact.queries, config.hot_query_limit),
        join_graph,
        reference_tables: artifact.reference_tables.clone(),
        failures: artifact.failed.clone(),
    }
}

/// Top queries by total query time, or by usage when no timings were recorded
fn hot_queries(queries: &[QueryAnalysisResult], limit: usize) -> Vec<HotQuery> {
    let timed = queries.iter().any(|q| q.query_time > 0.0);

    let mut hot: Vec<HotQuery> = queries
        .iter()
        .map(|q| HotQuery {
            query: q.query_structure.clone(),
            usage_count: q.usage_count,
            query_time: q.query_time,
            first_line: q.line_numbers.first().copied().unwrap_or_default(),
        })
        .collect();

    hot.sort_by(|a, b| {
        let primary = if timed {
            b.query_time.total_cmp(&a.query_time)
        } else {
            b.usage_count.cmp(&a.usage_count)
        };
        primary.then(a.first_line.cmp(&b.first_line))
    });
    hot.truncate(limit);
    hot
}

/// Render a keys summary for the terminal
pub fn render_keys_summary(summary: &KeysSummary) -> String {
    let mut out = String::new();
    out.push_str("\n🔑 ");
    out.push_str(&"Keys Summary".bold().to_string());
    out.push_str("\n---------------------------------------------------\n");

    for t in &summary.tables {
        out.push_str(&format!(
            "{} (used {} times: {} reads, {} writes)\n",
            t.table.bold(),
            t.use_count(),
            t.read_query_count,
            t.write_query_count
        ));
        for c in &t.columns {
            out.push_str(&format!(
                "  {:<12} {:<24} {:>6} {:>7.2}%\n",
                c.position.to_string(),
                c.column,
                c.count,
                c.percentage
            ));
        }
        for p in &t.join_predicates {
            out.push_str(&format!("  ⇄ {} {} {}\n", p.lhs, p.op, p.rhs));
        }
        out.push('\n');
    }

    if !summary.hot_queries.is_empty() {
        out.push_str(&format!("{}\n", "🔥 Hot Queries".bold()));
        for (i, q) in summary.hot_queries.iter().enumerate() {
            let time = if q.query_time > 0.0 {
                format!(", {:.3}s", q.query_time)
            } else {
                String::new()
            };
            out.push_str(&format!(
                "  {}. {} (x{}{}, line {})\n",
                i + 1,
                q.query,
                q.usage_count,
                time,
                q.first_line
            ));
        }
        out.push('\n');
    }

    if !summary.join_graph.is_empty() {
        out.push_str(&format!("{}\n", "Join Graph".bold()));
        for e in &summary.join_graph {
            out.push_str(&format!("  {} ⇄ {}: {} queries\n", e.left, e.right, e.queries));
        }
        out.push('\n');
    }

    if !summary.reference_tables.is_empty() {
        out.push_str(&format!(
            "{} {}\n\n",
            "Reference candidates:".bold(),
            summary.reference_tables.join(", ")
        ));
    }

    if !summary.failures.is_empty() {
        out.push_str(&format!(
            "{}\n",
            format!("⚠️  {} queries failed", summary.failures.len())
                .yellow()
                .bold()
        ));
        for f in &summary.failures {
            let lines: Vec<String> = f.line_numbers.iter().map(|l| l.to_string()).collect();
            let expected = if f.expected { " (expected)" } else { "" };
            out.push_str(&format!(
                "  line {}: {}{}\n    {}\n",
                lines.join(","),
                f.error,
                expected,
                f.query
            ));
        }
    }

    out
}
