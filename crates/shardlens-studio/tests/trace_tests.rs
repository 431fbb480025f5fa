use pretty_assertions::assert_eq;
use shardlens_studio::summarize::summarize;
use shardlens_studio::trace::{diff_traces, read_trace, summarize_queries, QuerySummary};
use shardlens_studio::utils::config::SummaryConfig;
use shardlens_studio::utils::error::OutputError;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn route_trace(query: &str, line: &str, shards: u64) -> String {
    format!(
        r#"{{"Query": "{}", "LineNumber": {}, "Trace": {{"OperatorType": "Route", "Variant": "Scatter", "NoOfCalls": 1, "AvgNumberOfRows": 16, "MedianNumberOfRows": 16, "ShardsQueried": {}}}}}"#,
        query, line, shards
    )
}

fn envelope(entries: &[String]) -> String {
    format!(r#"{{"fileType": "trace", "queries": [{}]}}"#, entries.join(","))
}

#[test]
fn test_single_route_summary() {
    let file = write_temp(&envelope(&[route_trace("select * from music", "1", 8)]));
    let queries = read_trace(file.path()).unwrap();
    let summaries = summarize_queries(&queries);

    assert_eq!(
        summaries[0].summary,
        QuerySummary {
            route_calls: 1,
            rows_sent: 16,
            rows_in_memory: 0,
            shards_queried: 8,
        }
    );
}

#[test]
fn test_hash_join_summary() {
    let trace = r#"[{"Query": "select * from a join b", "LineNumber": "3", "Trace": {
        "OperatorType": "Join", "Variant": "HashJoin", "NoOfCalls": 1, "AvgNumberOfRows": 10, "MedianNumberOfRows": 10,
        "Inputs": [
            {"OperatorType": "Route", "Variant": "Scatter", "NoOfCalls": 1, "AvgNumberOfRows": 10, "MedianNumberOfRows": 10, "ShardsQueried": 8},
            {"OperatorType": "Route", "Variant": "Scatter", "NoOfCalls": 10, "AvgNumberOfRows": 1, "MedianNumberOfRows": 1, "ShardsQueried": 8}
        ]}}]"#;
    let file = write_temp(trace);
    let queries = read_trace(file.path()).unwrap();
    let summary = &summarize_queries(&queries)[0].summary;

    assert_eq!(summary.route_calls, 11);
    assert_eq!(summary.rows_sent, 20);
    assert_eq!(summary.rows_in_memory, 10);
    assert_eq!(summary.shards_queried, 16);
}

#[test]
fn test_root_array_is_sorted_by_line_number() {
    let file = write_temp(&format!(
        "[{},{},{}]",
        route_trace("c", "\"extra\"", 1),
        route_trace("b", "\"10\"", 1),
        route_trace("a", "2", 1)
    ));
    let queries = read_trace(file.path()).unwrap();
    let lines: Vec<&str> = queries.iter().map(|q| q.line_number.as_str()).collect();
    assert_eq!(lines, vec!["2", "10", "extra"]);
}

#[test]
fn test_compare_two_runs() {
    colored::control::set_override(false);

    let before = write_temp(&envelope(&[
        route_trace("select * from music", "1", 8),
        route_trace("select * from user", "2", 8),
    ]));
    let after = write_temp(&envelope(&[route_trace("select * from music", "1", 7)]));

    let diff = diff_traces(
        &read_trace(before.path()).unwrap(),
        &read_trace(after.path()).unwrap(),
        10.0,
    );
    assert_eq!(diff.queries.len(), 1);
    assert!(diff.queries[0].significant);

    let paths = vec![before.path().to_path_buf(), after.path().to_path_buf()];
    let report = summarize(&paths, &SummaryConfig::default()).unwrap();
    assert!(report.contains("Trace Comparison"));
    assert!(report.contains("-12.50%"));
    assert!(report.contains("✅ Significant improvement"));
    assert!(report.contains("Summary (1 queries compared, 1 significant at 10.00%)"));
}

#[test]
fn test_three_trace_files_are_rejected() {
    let file = write_temp(&envelope(&[route_trace("a", "1", 1)]));
    let path: PathBuf = file.path().to_path_buf();
    let err = summarize(&[path.clone(), path.clone(), path], &SummaryConfig::default())
        .unwrap_err();
    assert!(matches!(err, OutputError::FileCount { count: 3, .. }));
}

#[test]
fn test_single_trace_summary_report() {
    colored::control::set_override(false);

    let file = write_temp(&envelope(&[route_trace("select * from music", "1", 8)]));
    let report = summarize(&[file.path().to_path_buf()], &SummaryConfig::default()).unwrap();
    assert!(report.contains("Trace Summary"));
    assert!(report.contains("Queries: 1"));
}
