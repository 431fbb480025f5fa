use shardlens_studio::commands::{
    execute_keys, execute_summarize, execute_transactions, validate_keys_args, KeysArgs,
    SummarizeArgs, TransactionsArgs,
};
use shardlens_studio::keys::KeysArtifact;
use shardlens_studio::loader::InputType;
use shardlens_studio::output::{read_artifact, FileType};
use shardlens_studio::transactions::TransactionsArtifact;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn script(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_validate_keys_args_valid() {
    let args = KeysArgs {
        input: "workload.sql".to_string(),
        ..Default::default()
    };
    assert!(validate_keys_args(&args).is_ok());
}

#[test]
fn test_validate_keys_args_empty_input() {
    assert!(validate_keys_args(&KeysArgs::default()).is_err());
}

#[test]
fn test_validate_keys_args_csv_without_mapping() {
    let args = KeysArgs {
        input: "workload.csv".to_string(),
        input_type: InputType::Csv,
        ..Default::default()
    };
    assert!(validate_keys_args(&args).is_err());
}

#[test]
fn test_validate_keys_args_bind_variables_need_gateway_log() {
    let args = KeysArgs {
        input: "workload.sql".to_string(),
        bind_variables: true,
        ..Default::default()
    };
    assert!(validate_keys_args(&args).is_err());

    let args = KeysArgs {
        input: "gateway.log".to_string(),
        input_type: InputType::GatewayLog,
        bind_variables: true,
        ..Default::default()
    };
    assert!(validate_keys_args(&args).is_ok());
}

#[test]
fn test_execute_keys_writes_artifact() {
    let input = script("select * from t where id = 1;\nselect * from t where id = 2;\n");
    let dir = tempdir().unwrap();
    let output = dir.path().join("keys.json");

    execute_keys(KeysArgs {
        input: input.path().to_str().unwrap().to_string(),
        output: Some(output.clone()),
        ..Default::default()
    })
    .unwrap();

    let artifact: KeysArtifact = read_artifact(&output, FileType::Keys).unwrap();
    assert_eq!(artifact.queries.len(), 1);
    assert_eq!(artifact.queries[0].usage_count, 2);
}

#[test]
fn test_execute_keys_missing_input_fails() {
    let result = execute_keys(KeysArgs {
        input: "/nonexistent/workload.sql".to_string(),
        ..Default::default()
    });
    assert!(result.is_err());
}

#[test]
fn test_execute_transactions_writes_artifact() {
    let input = script(
        "BEGIN;\nupdate t set a = 1 where id = 1;\nCOMMIT;\nBEGIN;\nupdate t set a = 2 where id = 2;\nCOMMIT;\n",
    );
    let dir = tempdir().unwrap();
    let output = dir.path().join("transactions.json");

    execute_transactions(TransactionsArgs {
        input: input.path().to_str().unwrap().to_string(),
        input_type: InputType::Sql,
        output: Some(output.clone()),
        csv_config: None,
    })
    .unwrap();

    let artifact: TransactionsArtifact = read_artifact(&output, FileType::Transactions).unwrap();
    assert_eq!(artifact.signatures.len(), 1);
    assert_eq!(artifact.signatures[0].count, 2);
}

#[test]
fn test_execute_summarize_requires_files() {
    assert!(execute_summarize(SummarizeArgs::default()).is_err());
}

#[test]
fn test_execute_summarize_with_config_file() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("keys.json");
    std::fs::write(&artifact, r#"{"fileType": "keys", "queries": []}"#).unwrap();
    let config = dir.path().join("summary.toml");
    std::fs::write(&config, "significant_change_threshold = 5.0\nhot_query_limit = 3\n").unwrap();

    let args = SummarizeArgs {
        files: vec![artifact],
        config_file: Some(config),
        threshold_percent: None,
        hot_queries: Some(1),
    };
    assert!(execute_summarize(args).is_ok());
}
