use shardlens_studio::loader::{open_loader, InputType, LoaderOptions, QueryKind, Record};
use shardlens_studio::utils::config::CsvConfig;
use shardlens_studio::utils::error::LoadError;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn load(
    input_type: InputType,
    content: &str,
    options: &LoaderOptions,
) -> (Vec<Record>, Result<(), LoadError>) {
    let file = write_temp(content);
    let mut loader = open_loader(input_type, file.path().to_str().unwrap(), options).unwrap();
    let records: Vec<Record> = loader.by_ref().collect();
    let status = loader.close();
    (records, status)
}

#[test]
fn test_sql_script_records() {
    let script = "# setup\n--skip\nselect 1;\n\nselect *\nfrom t\nwhere a = 1;\n";
    let (records, status) = load(InputType::Sql, script, &LoaderOptions::default());
    assert!(status.is_ok());

    let sql: Vec<&Record> = records.iter().filter(|r| r.is_sql()).collect();
    assert_eq!(sql.len(), 2);
    assert_eq!(sql[1].query_text, "select *\nfrom t\nwhere a = 1;");
    assert_eq!(sql[1].line_number, 5);
    assert_eq!(records[0].kind, QueryKind::Comment);
    assert!(matches!(records[1].kind, QueryKind::Directive(_)));
}

#[test]
fn test_sql_script_missing_semicolon_fails() {
    let (records, status) = load(InputType::Sql, "select 1;\nselect 2", &LoaderOptions::default());
    assert_eq!(records.len(), 1);
    assert!(matches!(status, Err(LoadError::MissingSemicolon)));
}

#[test]
fn test_slow_log_metrics() {
    let log = "\
/usr/sbin/mysqld, Version: 8.0.36. started with:
Tcp port: 3306  Unix socket: /tmp/mysql.sock
# Time: 2024-03-01T10:00:00.000000Z
# User@Host: app[app] @ localhost []  Id:    12
# Query_time: 0.250000  Lock_time: 0.000002 Rows_sent: 1  Rows_examined: 40
SET timestamp=1709287200;
select * from users where id = 3;
";
    let (records, status) = load(InputType::SlowLog, log, &LoaderOptions::default());
    assert!(status.is_ok());
    assert_eq!(records.len(), 1);

    let metrics = records[0].metrics.unwrap();
    assert_eq!(records[0].query_text, "select * from users where id = 3;");
    assert_eq!(metrics.connection_id, 12);
    assert_eq!(metrics.query_time_seconds, 0.25);
    assert_eq!(metrics.rows_examined, 40);
    assert_eq!(metrics.timestamp_unix, 1709287200);
}

#[test]
fn test_csv_requires_column_mapping() {
    let file = write_temp("select 1\n");
    let result = open_loader(
        InputType::Csv,
        file.path().to_str().unwrap(),
        &LoaderOptions::default(),
    );
    assert!(result.is_err());
}

#[test]
fn test_csv_with_mapping() {
    let options = LoaderOptions {
        bind_variables: false,
        csv: Some(CsvConfig::with_query_field(1)),
    };
    let (records, status) = load(InputType::Csv, "1,select * from t\n2,select * from u\n", &options);
    assert!(status.is_ok());
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].query_text, "select * from u");
}

#[test]
fn test_missing_file_fails_to_open() {
    let result = open_loader(
        InputType::Sql,
        "/nonexistent/workload.sql",
        &LoaderOptions::default(),
    );
    assert!(result.is_err());
}
