//! Keys analyzer: canonicalize each statement and accumulate its keys.

use super::schema::{KeysArtifact, QueryAnalysisResult, QueryFailure};
use super::state::{DirectiveState, SqlAction};
use crate::loader::{QueryKind, Record};
use crate::sql::{
    canonicalize, extract_keys, normalize, parse, strip_vexplain, SchemaInfo, StatementType,
};
use crate::utils::config::KeysConfig;
use crate::utils::error::{LoadError, SqlError};
use log::{debug, warn};
use std::collections::HashMap;

/// Accumulates analysis results over a record stream
#[derive(Debug, Default)]
pub struct KeysAnalyzer {
    config: KeysConfig,
    schema: SchemaInfo,
    state: DirectiveState,
    /// Multiplier set by `usage_count`, consumed by the next SQL record
    pending_count: Option<usize>,

    results: Vec<QueryAnalysisResult>,
    result_index: HashMap<String, usize>,
    failures: Vec<QueryFailure>,
    failure_index: HashMap<String, usize>,
    reference_tables: Vec<String>,
}

impl KeysAnalyzer {
    pub fn new(config: KeysConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Seed the analyzer with known table definitions
    pub fn with_schema(mut self, schema: SchemaInfo) -> Self {
        self.schema = schema;
        self
    }

    /// Feed one record
    ///
    /// # Errors
    /// * `LoadError::InvalidDirective` - directive transitions that are not allowed
    pub fn process(&mut self, record: &Record) -> Result<(), LoadError> {
        match &record.kind {
            QueryKind::Directive(directive) => {
                if let crate::loader::Directive::UsageCount(n) = directive {
                    self.pending_count = Some(*n);
                }
                self.state
                    .enter(directive, &self.config, record.line_number)
            }
            QueryKind::Sql => {
                let count = self.pending_count.take().unwrap_or(1);
                match self.state.on_sql() {
                    SqlAction::Discard => {
                        debug!("Skipping statement at line {}", record.line_number);
                    }
                    SqlAction::Analyze {
                        expected_error,
                        vexplain,
                        reference,
                    } => {
                        let text = if vexplain {
                            strip_vexplain(&record.query_text)
                        } else {
                            record.query_text.as_str()
                        };

                        if let Err(e) = self.analyze(text, record, count, reference) {
                            self.record_failure(text, &e, record.line_number, expected_error);
                        }
                    }
                }
                Ok(())
            }
            QueryKind::Comment | QueryKind::CommentWithDirective | QueryKind::EmptyLine => {
                self.state.on_other();
                Ok(())
            }
        }
    }

    fn analyze(
        &mut self,
        text: &str,
        record: &Record,
        count: usize,
        reference: bool,
    ) -> Result<(), SqlError> {
        let mut statement = parse(text)?;

        if self.schema.register(&statement) {
            debug!(
                "Registered table definition at line {} ({} tables known)",
                record.line_number,
                self.schema.len()
            );
            return Ok(());
        }

        let statement_type = StatementType::of(&statement);
        normalize(&mut statement);
        let keys = extract_keys(&statement, &self.schema)?;
        let canonical = canonicalize(&statement);

        if reference {
            for table in &keys.table_names {
                if !self.reference_tables.contains(table) {
                    self.reference_tables.push(table.clone());
                }
            }
        }

        let index = match self.result_index.get(&canonical) {
            Some(&index) => index,
            None => {
                self.results.push(QueryAnalysisResult {
                    query_structure: canonical.clone(),
                    usage_count: 0,
                    line_numbers: Vec::new(),
                    table_names: keys.table_names,
                    statement_type,
                    filter_columns: keys.filter_columns,
                    grouping_columns: keys.grouping_columns,
                    join_predicates: keys.join_predicates,
                    query_time: 0.0,
                    lock_time: 0.0,
                    rows_sent: 0,
                    rows_examined: 0,
                    timestamp: 0,
                });
                self.result_index.insert(canonical, self.results.len() - 1);
                self.results.len() - 1
            }
        };

        let result = &mut self.results[index];
        result.usage_count += count;
        result.line_numbers.push(record.line_number);

        if let Some(metrics) = record.metrics {
            result.query_time += metrics.query_time_seconds;
            result.lock_time += metrics.lock_time_seconds;
            result.rows_sent += metrics.rows_sent;
            result.rows_examined += metrics.rows_examined;
            result.timestamp = result.timestamp.max(metrics.timestamp_unix);
        }

        Ok(())
    }

    fn record_failure(&mut self, query: &str, error: &SqlError, line: usize, expected: bool) {
        if expected {
            debug!("Expected failure at line {}: {}", line, error);
        } else {
            warn!("Failed to analyze line {}: {}", line, error);
        }

        match self.failure_index.get(query) {
            Some(&index) => self.failures[index].line_numbers.push(line),
            None => {
                self.failures.push(QueryFailure {
                    query: query.to_string(),
                    error: error.to_string(),
                    line_numbers: vec![line],
                    expected,
                });
                self.failure_index
                    .insert(query.to_string(), self.failures.len() - 1);
            }
        }
    }

    /// Build the artifact, ordered by first observed line
    pub fn finish(self) -> KeysArtifact {
        let mut queries = self.results;
        queries.sort_by_key(|q| q.line_numbers.first().copied().unwrap_or(usize::MAX));

        let mut artifact = KeysArtifact::new(queries, self.failures);
        artifact.reference_tables = self.reference_tables;
        artifact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{Directive, QueryMetrics};

    fn sql(text: &str, line: usize) -> Record {
        Record::sql(text, line)
    }

    fn directive(d: Directive, line: usize) -> Record {
        Record::other(QueryKind::Directive(d.clone()), d.to_string(), line)
    }

    fn run(records: &[Record]) -> KeysArtifact {
        let mut analyzer = KeysAnalyzer::default();
        for record in records {
            analyzer.process(record).unwrap();
        }
        analyzer.finish()
    }

    #[test]
    fn test_identical_structures_coalesce() {
        let artifact = run(&[
            sql("select * from t where id = 1", 1),
            sql("select * from u", 2),
            sql("select * from t where id = 2", 3),
        ]);

        assert_eq!(artifact.queries.len(), 2);
        assert_eq!(artifact.queries[0].usage_count, 2);
        assert_eq!(artifact.queries[0].line_numbers, vec![1, 3]);
        assert_eq!(artifact.queries[1].line_numbers, vec![2]);
    }

    #[test]
    fn test_skip_discards_only_next_statement() {
        let artifact = run(&[
            directive(Directive::Skip, 1),
            sql("SELECT 1;", 2),
            sql("SELECT 2;", 3),
        ]);
        assert_eq!(artifact.queries.len(), 1);
        assert_eq!(artifact.queries[0].line_numbers, vec![3]);
    }

    #[test]
    fn test_blank_line_ends_skip() {
        let artifact = run(&[
            directive(Directive::Skip, 1),
            Record::other(QueryKind::EmptyLine, "", 2),
            sql("select * from a", 3),
            sql("select * from b", 4),
        ]);
        let queries: Vec<&str> = artifact
            .queries
            .iter()
            .map(|q| q.query_structure.as_str())
            .collect();
        assert_eq!(queries, vec!["SELECT * FROM a", "SELECT * FROM b"]);
    }

    #[test]
    fn test_create_table_emits_no_result_and_feeds_schema() {
        let artifact = run(&[
            sql("create table a (id int, name varchar(10))", 1),
            sql("create table b (id int, a_id int)", 2),
            sql("select * from a join b on a.id = b.a_id where name = 'x'", 3),
        ]);
        assert_eq!(artifact.queries.len(), 1);
        assert!(artifact.failed.is_empty());
    }

    #[test]
    fn test_failures_coalesce_and_continue() {
        let artifact = run(&[
            sql("selec broken", 1),
            sql("select * from t", 2),
            sql("selec broken", 3),
        ]);
        assert_eq!(artifact.queries.len(), 1);
        assert_eq!(artifact.failed.len(), 1);
        assert_eq!(artifact.failed[0].line_numbers, vec![1, 3]);
        assert!(!artifact.failed[0].expected);
    }

    #[test]
    fn test_error_directive_marks_failure_expected() {
        let artifact = run(&[directive(Directive::Error, 1), sql("selec broken", 2)]);
        assert!(artifact.failed[0].expected);
    }

    #[test]
    fn test_usage_count_reference_and_vexplain() {
        let artifact = run(&[
            directive(Directive::UsageCount(5), 1),
            sql("select * from t", 2),
            directive(Directive::Reference, 3),
            sql("select * from countries", 4),
            directive(Directive::VExplain, 5),
            sql("vexplain plan select * from t", 6),
        ]);
        assert_eq!(artifact.queries[0].usage_count, 6);
        assert_eq!(artifact.queries[0].line_numbers, vec![2, 6]);
        assert_eq!(artifact.reference_tables, vec!["countries"]);
    }

    #[test]
    fn test_metrics_accumulate() {
        let metrics = QueryMetrics {
            query_time_seconds: 0.5,
            rows_sent: 3,
            timestamp_unix: 100,
            ..Default::default()
        };
        let artifact = run(&[
            sql("select * from t", 1).with_metrics(metrics),
            sql("select * from t", 2).with_metrics(QueryMetrics {
                timestamp_unix: 50,
                ..metrics
            }),
        ]);
        let q = &artifact.queries[0];
        assert_eq!(q.query_time, 1.0);
        assert_eq!(q.rows_sent, 6);
        assert_eq!(q.timestamp, 100);
    }

    #[test]
    fn test_nested_states_fail() {
        let mut analyzer = KeysAnalyzer::default();
        analyzer.process(&directive(Directive::Skip, 1)).unwrap();
        assert!(analyzer.process(&directive(Directive::Error, 2)).is_err());
    }
}
