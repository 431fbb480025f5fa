use pretty_assertions::assert_eq;
use shardlens_studio::keys::{analyze_keys, KeysArtifact};
use shardlens_studio::loader::{open_loader, InputType, LoaderOptions};
use shardlens_studio::output::{read_artifact, write_artifact, FileType};
use shardlens_studio::sql::{ColumnRef, ComparisonOp, StatementType};
use shardlens_studio::summarize::summarize;
use shardlens_studio::utils::config::{KeysConfig, SummaryConfig};
use std::collections::HashMap;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

const SCRIPT: &str = "\
create table users (id int, name varchar(64), country varchar(2));
create table orders (id int, user_id int, total int);

# lookups
select * from users where id = 1;
select * from users where id = 2;
select * from users u join orders o on u.id = o.user_id where name = 'ann';
--usage_count 4
update orders set total = 3 where id = 9;
--error
selec broken;
--skip_if_below_version mysql 9
select * from users where country = 'de';
";

fn run(script: &str, config: &KeysConfig) -> KeysArtifact {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(script.as_bytes()).unwrap();

    let mut loader = open_loader(
        InputType::Sql,
        file.path().to_str().unwrap(),
        &LoaderOptions::default(),
    )
    .unwrap();
    analyze_keys(loader.as_mut(), config).unwrap()
}

#[test]
fn test_script_analysis() {
    let mut versions = HashMap::new();
    versions.insert("mysql".to_string(), 8);
    let artifact = run(SCRIPT, &KeysConfig { versions });

    assert_eq!(artifact.file_type, FileType::Keys);
    assert_eq!(artifact.queries.len(), 3);

    let lookup = &artifact.queries[0];
    assert_eq!(lookup.query_structure, "SELECT * FROM users WHERE id = :v1");
    assert_eq!(lookup.usage_count, 2);
    assert_eq!(lookup.line_numbers, vec![5, 6]);
    assert_eq!(lookup.statement_type, StatementType::Select);

    // name resolves through the CREATE TABLE statements
    let join = &artifact.queries[1];
    assert_eq!(join.table_names, vec!["users", "orders"]);
    assert_eq!(join.filter_columns[0].column, ColumnRef::new("users", "name"));
    assert_eq!(join.join_predicates[0].op, ComparisonOp::Eq);

    let update = &artifact.queries[2];
    assert_eq!(update.statement_type, StatementType::Update);
    assert_eq!(update.line_numbers, vec![9]);

    assert_eq!(artifact.failed.len(), 1);
    assert!(artifact.failed[0].expected);
}

#[test]
fn test_version_gate_runs_when_recent_enough() {
    let mut versions = HashMap::new();
    versions.insert("mysql".to_string(), 9);
    let artifact = run(SCRIPT, &KeysConfig { versions });
    assert_eq!(artifact.queries.len(), 4);
}

#[test]
fn test_artifact_round_trip_and_summary() {
    colored::control::set_override(false);

    let artifact = run(SCRIPT, &KeysConfig::default());
    let dir = tempdir().unwrap();
    let path = dir.path().join("reports").join("keys.json");
    write_artifact(&artifact, &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.trim_start().starts_with("{\n  \"fileType\": \"keys\""));

    let loaded: KeysArtifact = read_artifact(&path, FileType::Keys).unwrap();
    assert_eq!(loaded.queries, artifact.queries);

    let report = summarize(&[path], &SummaryConfig::default()).unwrap();
    assert!(report.contains("Keys Summary"));
    assert!(report.contains("users (used"));
    assert!(report.contains("orders ⇄ users: 1 queries") || report.contains("users ⇄ orders: 1 queries"));
    assert!(report.contains("queries failed"));
}

#[test]
fn test_unknown_directive_aborts_analysis() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"select 1;\n--frobnicate\nselect 2;\n").unwrap();

    let mut loader = open_loader(
        InputType::Sql,
        file.path().to_str().unwrap(),
        &LoaderOptions::default(),
    )
    .unwrap();
    assert!(analyze_keys(loader.as_mut(), &KeysConfig::default()).is_err());
}
