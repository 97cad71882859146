// crates/rt-cli/tests/commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests running the rt binary.
// Purpose: Ensure commands report success and fail with stable messages.
// Dependencies: rt-cli binary, tempfile
// ============================================================================

//! ## Overview
//! Runs the `rt` binary against temporary config documents and record files.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn rt_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rt"))
}

fn run(args: &[&str]) -> Output {
    Command::new(rt_bin()).args(args).env_remove("RT_LOG").output().expect("run rt")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn version_prints_package_version() {
    let output = run(&["version"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with(&format!("rt {} (", env!("CARGO_PKG_VERSION"))), "unexpected: {text}");
    assert!(text.contains(std::env::consts::OS));
}

#[test]
fn config_check_lists_backends() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = r#"
deployment_state "s3" {
  bucket = "rt-{{ AwsAccountId }}"
  key    = "{{ Environment }}/"
}

deployment_state "memory" {}

remote_state {
  backend = "s3"
  config  = {
    bucket = "tf-state"
  }
}
"#;
    fs::write(dir.path().join("rt.hcl.tpl"), config).expect("write config");
    let path = dir.path().to_string_lossy().into_owned();
    let output = run(&["config", "check", "--env", "test", "--account-id", "123456789012", &path]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("deployment_state s3: ok"), "unexpected: {text}");
    assert!(text.contains("deployment_state memory: ok"), "unexpected: {text}");
    assert!(text.contains("remote_state s3: ok"), "unexpected: {text}");
}

#[test]
fn config_check_logs_resolved_path_when_enabled() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("rt.hcl.tpl"), "deployment_state \"memory\" {}\n").expect("write config");
    let path = dir.path().to_string_lossy().into_owned();
    let output = Command::new(rt_bin())
        .args(["config", "check", &path])
        .env("RT_LOG", "debug")
        .output()
        .expect("run rt");
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("resolved config file"), "stderr: {}", stderr(&output));

    let quiet = run(&["config", "check", &path]);
    assert!(quiet.status.success());
    assert!(!stderr(&quiet).contains("resolved config file"));
}

#[test]
fn config_check_reports_registry_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("rt.hcl.tpl"), "deployment_state \"s3\" {\n  key = \"//yada/\"\n}\n")
        .expect("write config");
    let path = dir.path().to_string_lossy().into_owned();
    let output = run(&["config", "check", &path]);
    assert!(!output.status.success());
    assert_eq!(
        stderr(&output).trim_end(),
        r#"Error initializing backend: "Unable to initalize backend with config: map["key":"//yada/"]: Missing bucket field in config""#
    );
}

#[test]
fn config_check_rejects_empty_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("rt.hcl.tpl"), "").expect("write config");
    let path = dir.path().to_string_lossy().into_owned();
    let output = run(&["config", "check", &path]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output).trim_end(), "No configuration provided");
}

#[test]
fn validate_accepts_and_rejects() {
    let ok = run(&["validate", "slot-id", "v1.2.3-special"]);
    assert!(ok.status.success());
    assert_eq!(stdout(&ok).trim_end(), "valid");

    let reserved = run(&["validate", "application", "shared-services"]);
    assert!(!reserved.status.success());
    assert!(stderr(&reserved).contains("historical reasons"));

    let long_env = run(&["validate", "environment", "preprod"]);
    assert!(!long_env.status.success());
}

#[test]
fn validate_percentage_parses_numbers() {
    assert!(run(&["validate", "percentage", "1.0"]).status.success());
    assert!(!run(&["validate", "percentage", "1.1"]).status.success());
    let output = run(&["validate", "percentage", "half"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("is not a number"));
}

#[test]
fn record_migrate_upgrades_unversioned_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("APPLICATION.json");
    fs::write(&file, r#"{"is_active":true,"infra_outputs":null,"slot_counters":{"pr":3}}"#)
        .expect("write record");
    let output = run(&["record", "migrate", "--kind", "application", &file.to_string_lossy()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("json output");
    assert_eq!(value["v"], 1);
    assert_eq!(value["is_active"], true);
    assert_eq!(value["infra_outputs"], serde_json::json!({}));
    assert_eq!(value["slot_counters"]["pr"], 3);
}

#[test]
fn record_migrate_refuses_newer_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("SLOT-blue.json");
    fs::write(&file, r#"{"v":99}"#).expect("write record");
    let output = run(&["record", "migrate", "--kind", "slot", &file.to_string_lossy()]);
    assert!(!output.status.success());
    assert_eq!(stderr(&output).trim_end(), "Failed to process slot data (schema v99). Please upgrade RT.");
}
