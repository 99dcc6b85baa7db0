use assert_cmd::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_compliancegraph"))
}

const IN_MEMORY: [&str; 4] = ["--relational-db", "memory", "--graph-db", "memory"];

#[test]
fn test_cli_exits_with_success_on_help() {
    let output = bin().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("--relational-db"));
}

#[test]
fn test_cli_in_memory_load_succeeds() {
    let output = bin()
        .args(IN_MEMORY)
        .args(["--institutions", "1", "--seed", "3", "--quiet"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("status=succeeded"), "{stdout}");
    assert!(stdout.contains("consistent=true"), "{stdout}");
}

#[test]
fn test_cli_json_output_is_parseable() {
    let output = bin()
        .args(IN_MEMORY)
        .args(["--institutions", "1", "--json", "--quiet"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["exit_code"], 0);
    assert_eq!(doc["run"]["status"], "succeeded");
    assert!(doc["reconciliation"]["entities"].is_object());
}

#[test]
fn test_cli_unknown_flag_is_a_usage_error() {
    bin().arg("--bogus").assert().failure().code(2);
}

#[test]
fn test_cli_invalid_value_is_a_usage_error() {
    bin()
        .args(IN_MEMORY)
        .args(["--batch-size", "0"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_cli_cleanup_on_disk_store() {
    let dir = tempfile::tempdir().unwrap();
    let relational = dir.path().join("relational.db");
    let graph = dir.path().join("graph.db");
    let paths = [
        "--relational-db",
        relational.to_str().unwrap(),
        "--graph-db",
        graph.to_str().unwrap(),
    ];
    bin()
        .args(paths)
        .args(["--institutions", "1", "--quiet"])
        .assert()
        .success();
    bin()
        .args(paths)
        .args(["--mode", "cleanup-only", "--quiet"])
        .assert()
        .success();
    let output = bin()
        .args(paths)
        .args(["--mode", "validate-only", "--json", "--quiet"])
        .output()
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        doc["reconciliation"]["entities"]["institution"]["relational_count"],
        0
    );
}
