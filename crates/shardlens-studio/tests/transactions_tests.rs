use pretty_assertions::assert_eq;
use shardlens_studio::loader::{open_loader, InputType, LoaderOptions};
use shardlens_studio::output::{write_artifact, FileType};
use shardlens_studio::sql::{ComparisonOp, StatementType};
use shardlens_studio::summarize::summarize;
use shardlens_studio::transactions::{analyze_transactions, Predicate, TransactionsArtifact};
use shardlens_studio::utils::config::SummaryConfig;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn run(input_type: InputType, content: &str) -> TransactionsArtifact {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();

    let mut loader = open_loader(
        input_type,
        file.path().to_str().unwrap(),
        &LoaderOptions::default(),
    )
    .unwrap();
    analyze_transactions(loader.as_mut()).unwrap()
}

const TWO_TRANSACTIONS: &str = "\
BEGIN;
UPDATE t SET c = 1 WHERE id = 1;
UPDATE t SET c = 1 WHERE id = 1 AND k = 10;
COMMIT;
BEGIN;
UPDATE t SET c = 1 WHERE id = 2;
UPDATE t SET c = 1 WHERE id = 2 AND k = 20;
COMMIT;
";

#[test]
fn test_repeated_signature_is_anonymized() {
    let artifact = run(InputType::Sql, TWO_TRANSACTIONS);
    assert_eq!(artifact.file_type, FileType::Transactions);
    assert_eq!(artifact.signatures.len(), 1);

    let signature = &artifact.signatures[0];
    assert_eq!(signature.count, 2);
    assert_eq!(signature.queries.len(), 2);
    assert_eq!(signature.queries[0].op, StatementType::Update);
    assert_eq!(signature.queries[0].affected_table, "t");
    assert_eq!(signature.queries[0].updated_columns, vec!["c"]);

    // id is shared by both statements, k is used once
    assert_eq!(
        signature.queries[1].predicates,
        vec![
            Predicate {
                table: "t".to_string(),
                col: "id".to_string(),
                op: ComparisonOp::Eq,
                val: 0,
            },
            Predicate {
                table: "t".to_string(),
                col: "k".to_string(),
                op: ComparisonOp::Eq,
                val: -1,
            },
        ]
    );
}

#[test]
fn test_rollback_and_single_occurrence_are_dropped() {
    let script = "\
BEGIN;
UPDATE t SET c = 1 WHERE id = 1;
ROLLBACK;
BEGIN;
UPDATE t SET c = 1 WHERE id = 2;
COMMIT;
BEGIN;
DELETE FROM u WHERE id = 3;
COMMIT;
";
    let artifact = run(InputType::Sql, script);
    assert!(artifact.signatures.is_empty());
}

#[test]
fn test_slow_log_autocommit_per_connection() {
    let log = "\
# Time: 2024-03-01T10:00:00.000000Z
# User@Host: app[app] @ localhost []  Id:    1
# Query_time: 0.1  Lock_time: 0.0 Rows_sent: 0  Rows_examined: 1
update accounts set balance = 5 where id = 1;
# User@Host: app[app] @ localhost []  Id:    2
# Query_time: 0.1  Lock_time: 0.0 Rows_sent: 0  Rows_examined: 1
update accounts set balance = 7 where id = 2;
# User@Host: app[app] @ localhost []  Id:    1
# Query_time: 0.1  Lock_time: 0.0 Rows_sent: 1  Rows_examined: 1
select * from accounts where id = 1;
";
    let artifact = run(InputType::SlowLog, log);

    assert_eq!(artifact.signatures.len(), 1);
    assert_eq!(artifact.signatures[0].count, 2);
    assert_eq!(artifact.signatures[0].queries[0].predicates[0].val, -1);
}

#[test]
fn test_transactions_summary_report() {
    colored::control::set_override(false);

    let artifact = run(InputType::Sql, TWO_TRANSACTIONS);
    let dir = tempdir().unwrap();
    let path = dir.path().join("transactions.json");
    write_artifact(&artifact, &path).unwrap();

    let report = summarize(&[path], &SummaryConfig::default()).unwrap();
    assert!(report.contains("Signature #1 (seen 2 times, 2 statements)"));
    assert!(report.contains("2. UPDATE t SET c WHERE t.id = :0 AND t.k = ?"));
}

fn slow_entry(connection: u64, sql: &str) -> String {
    format!(
        "# User@Host: app[app] @ localhost []  Id:    {}\n# Query_time: 0.01  Lock_time: 0.0 Rows_sent: 0  Rows_examined: 1\n{}\n",
        connection, sql
    )
}

fn interleaved_log() -> String {
    let mut log = String::from("# Time: 2024-03-01T10:00:00.000000Z\n");
    for (connection, sql) in [
        (1, "BEGIN;"),
        (2, "BEGIN;"),
        (1, "update accounts set balance = 1 where id = 7;"),
        (2, "update accounts set balance = 2 where id = 8;"),
        (2, "select * from accounts where id = 8;"),
        (1, "select * from accounts where id = 7;"),
        (1, "COMMIT;"),
        (2, "COMMIT;"),
        (3, "BEGIN;"),
        (3, "delete from events where id = 1 and kind = 4;"),
        (3, "COMMIT;"),
        (1, "BEGIN;"),
        (1, "delete from events where id = 2 and kind = 5;"),
        (1, "COMMIT;"),
    ] {
        log.push_str(&slow_entry(connection, sql));
    }
    log
}

#[test]
fn test_signatures_are_deterministic_and_slots_consistent() {
    let log = interleaved_log();
    let first = run(InputType::SlowLog, &log);
    let second = run(InputType::SlowLog, &log);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    assert_eq!(first.signatures.len(), 2);
    assert!(first.signatures.iter().all(|s| s.count == 2));

    // The shared account id keeps slot 0, single-use delete values become -1
    let account = &first.signatures[0];
    assert!(account.queries.iter().all(|q| q.predicates[0].val == 0));
    let events = &first.signatures[1];
    assert!(events.queries[0].predicates.iter().all(|p| p.val == -1));

    // A kept slot is shared by at least two predicates and slots are numbered densely
    for signature in &first.signatures {
        let mut uses: BTreeMap<i64, usize> = BTreeMap::new();
        for predicate in signature.queries.iter().flat_map(|q| &q.predicates) {
            if predicate.val >= 0 {
                *uses.entry(predicate.val).or_default() += 1;
            }
        }
        assert!(uses.values().all(|&n| n >= 2));
        let slots: Vec<i64> = uses.keys().copied().collect();
        let dense: Vec<i64> = (0..slots.len() as i64).collect();
        assert_eq!(slots, dense);
    }
}
