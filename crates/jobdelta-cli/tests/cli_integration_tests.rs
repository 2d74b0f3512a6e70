//! CLI integration tests
//!
//! These tests run the built binary against job records written to a
//! temporary directory and check the JSON it prints.

use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn committed_record() -> Value {
    json!({
        "id": 42,
        "choices": [
            {"dpchId": 100, "choiceLabel": "Cabinets", "dpchQuantity": 1,
             "options": [{"planOptionId": 1, "integrationKey": "OPT-1"}]},
            {"dpchId": 300, "choiceLabel": "Flooring", "dpchQuantity": 1}
        ],
        "buyers": [{"contactAssociationId": 1, "isPrimaryBuyer": true,
                    "firstName": "Ada", "lastName": "Byron"}],
        "handing": "Left",
        "lotId": 17
    })
}

fn desired_record() -> Value {
    json!({
        "id": 42,
        "choices": [
            {"dpchId": 100, "choiceLabel": "Cabinets", "dpchQuantity": 1,
             "options": [{"planOptionId": 2, "integrationKey": "OPT-2"}]},
            {"dpchId": 300, "choiceLabel": "Flooring", "dpchQuantity": 1}
        ],
        "buyers": [{"contactAssociationId": 1, "isPrimaryBuyer": true,
                    "firstName": "Ada", "lastName": "Lovelace"}],
        "handing": "Left",
        "lotId": 17
    })
}

fn run(dir: &TempDir, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_jobdelta");
    Command::new(cli_bin)
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .args(args)
        .output()
        .expect("Failed to execute CLI")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "CLI command should succeed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_diff_prints_deltas() {
    let dir = TempDir::new().unwrap();
    let committed = write_json(&dir, "committed.json", &committed_record());
    let desired = write_json(&dir, "desired.json", &desired_record());

    let output = run(
        &dir,
        &[
            "diff",
            "--committed",
            committed.to_str().unwrap(),
            "--desired",
            desired.to_str().unwrap(),
        ],
    );
    let deltas = stdout_json(&output);

    let deltas = deltas.as_array().unwrap();
    assert_eq!(deltas.len(), 2);
    assert_eq!(deltas[0]["family"], "choice");
    assert_eq!(deltas[0]["action"], "Change");
    assert_eq!(deltas[0]["children"]["options"].as_array().unwrap().len(), 2);
    assert_eq!(deltas[1]["family"], "buyer");
    assert_eq!(deltas[1]["fields"]["lastName"], "Lovelace");
}

#[test]
fn test_cli_diff_builds_change_order_with_digest() {
    let dir = TempDir::new().unwrap();
    let committed = write_json(&dir, "committed.json", &committed_record());
    let desired = write_json(&dir, "desired.json", &desired_record());

    let output = run(
        &dir,
        &[
            "diff",
            "--committed",
            committed.to_str().unwrap(),
            "--desired",
            desired.to_str().unwrap(),
            "--kind",
            "sales",
            "--version",
            "5",
        ],
    );
    let order = stdout_json(&output);

    assert_eq!(order["jobId"], 42);
    assert_eq!(order["kind"], "sales");
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["baseVersion"], 5);
    assert_eq!(order["deltas"].as_array().unwrap().len(), 1);
    assert_eq!(order["digest"].as_str().unwrap().len(), 64);
}

#[test]
fn test_cli_diff_reports_pending_conflict() {
    let dir = TempDir::new().unwrap();
    let committed = write_json(&dir, "committed.json", &committed_record());
    let desired = write_json(&dir, "desired.json", &desired_record());
    let open = write_json(
        &dir,
        "open.json",
        &json!({"id": 31, "jobId": 42, "kind": "sales", "status": "Pending"}),
    );

    let output = run(
        &dir,
        &[
            "diff",
            "--committed",
            committed.to_str().unwrap(),
            "--desired",
            desired.to_str().unwrap(),
            "--kind",
            "construction",
            "--open",
            open.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already pending"), "stderr: {}", stderr);
    assert!(
        stderr.contains("code: ERR_PENDING_CHANGE_ORDER_CONFLICT (request_id: "),
        "stderr: {}",
        stderr
    );
}

#[test]
fn test_cli_apply_then_restore() {
    let dir = TempDir::new().unwrap();
    let committed = write_json(&dir, "committed.json", &committed_record());
    let desired = write_json(&dir, "desired.json", &desired_record());
    let deltas_path = dir.path().join("deltas.json");

    let output = run(
        &dir,
        &[
            "diff",
            "--committed",
            committed.to_str().unwrap(),
            "--desired",
            desired.to_str().unwrap(),
            "--output",
            deltas_path.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());
    assert!(deltas_path.exists());

    let output = run(
        &dir,
        &[
            "apply",
            "--committed",
            committed.to_str().unwrap(),
            "--deltas",
            deltas_path.to_str().unwrap(),
        ],
    );
    let effective = stdout_json(&output);
    assert_eq!(effective["choices"][0]["options"][0]["catalogId"], 2);
    assert_eq!(effective["buyers"][0]["lastName"], "Lovelace");

    let output = run(
        &dir,
        &["restore", "--committed", committed.to_str().unwrap()],
    );
    let restored = stdout_json(&output);
    assert_eq!(restored["choices"][0]["options"][0]["catalogId"], 1);
}

#[test]
fn test_cli_locks_reports_rules() {
    let dir = TempDir::new().unwrap();
    let committed = write_json(&dir, "committed.json", &committed_record());
    let mapping = write_json(
        &dir,
        "mapping.json",
        &json!([{"integrationKey": "OPT-1", "choices": [{"catalogId": 100, "mandatory": true}]}]),
    );

    let output = run(
        &dir,
        &[
            "locks",
            "--committed",
            committed.to_str().unwrap(),
            "--mapping",
            mapping.to_str().unwrap(),
        ],
    );
    let resolution = stdout_json(&output);

    let locked = resolution["locked"].as_array().unwrap();
    assert_eq!(locked.len(), 2);
    assert_eq!(locked[0]["origin"]["source"], "committed");
    assert_eq!(locked[0]["optionRules"][0]["synthetic"], false);
    assert!(resolution["lockedOptions"].as_array().unwrap().is_empty());
    assert!(resolution["warnings"].as_array().unwrap().is_empty());
}

#[test]
fn test_cli_rejects_unknown_config_keys() {
    let dir = TempDir::new().unwrap();
    let committed = write_json(&dir, "committed.json", &committed_record());
    let config = dir.path().join("jobdelta.toml");
    fs::write(&config, "[change_order]\nrejectEmpty = false\n").unwrap();

    let output = run(
        &dir,
        &[
            "--config",
            config.to_str().unwrap(),
            "restore",
            "--committed",
            committed.to_str().unwrap(),
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration error"), "stderr: {}", stderr);
    assert!(stderr.contains("code: ERR_CONFIG"), "stderr: {}", stderr);
}
