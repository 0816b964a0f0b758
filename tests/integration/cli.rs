//! Integration tests for the `statescope` binary

use super::common::fixtures::{counter_log, legacy_log, LogFixture};
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;

fn statescope(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("statescope").expect("binary is built");
    cmd.arg("--data-dir").arg(data_dir.path()).env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

#[test]
fn test_replay_prints_final_state() {
    let data = TempDir::new().unwrap();
    let log = LogFixture::write(&counter_log());

    let output = statescope(&data)
        .arg("replay")
        .arg(&log.path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output.stdout),
        json!({"counter": {"count": 5, "step": 1}, "flag": true})
    );
}

#[test]
fn test_replay_at_index() {
    let data = TempDir::new().unwrap();
    let log = LogFixture::write(&counter_log());

    let output = statescope(&data)
        .args(["replay", "--at", "2"])
        .arg(&log.path)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        stdout_json(&output.stdout),
        json!({"counter": {"count": 2, "step": 1}, "flag": false})
    );

    statescope(&data)
        .args(["replay", "--at", "9"])
        .arg(&log.path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("beyond the end"));
}

#[test]
fn test_inspect_lists_messages() {
    let data = TempDir::new().unwrap();
    let log = LogFixture::write(&legacy_log());

    statescope(&data)
        .arg("inspect")
        .arg(&log.path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 messages (legacy)"))
        .stdout(predicate::str::contains("a Counter Increment#c1"));
}

#[test]
fn test_convert_writes_versioned_document() {
    let data = TempDir::new().unwrap();
    let log = LogFixture::write(&legacy_log());
    let out = data.path().join("converted.json");

    statescope(&data)
        .arg("convert")
        .arg(&log.path)
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["version"], "1");
    assert_eq!(written["initial"], json!({"counter": {"count": 0}}));
    assert_eq!(written["messages"].as_array().unwrap().len(), 2);
    assert_eq!(written["messages"][0]["delta"], json!([[["counter"], {"count": 1}]]));
}

#[test]
fn test_unknown_version_is_rejected() {
    let data = TempDir::new().unwrap();
    let log = LogFixture::write(&json!({"version": "2", "messages": []}));

    statescope(&data)
        .arg("replay")
        .arg(&log.path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown message log format/version"));
}

#[test]
fn test_first_run_creates_config_and_log_file() {
    let data = TempDir::new().unwrap();
    let log = LogFixture::write(&counter_log());

    statescope(&data).arg("inspect").arg(&log.path).assert().success();

    assert!(data.path().join("config.toml").exists());
    assert!(data.path().join("logs").join("statescope.log").exists());
}
