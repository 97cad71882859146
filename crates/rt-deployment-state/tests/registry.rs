//! Backend registry tests for rt-deployment-state.
// crates/rt-deployment-state/tests/registry.rs
// ============================================================================
// Module: Backend Registry Tests
// Description: Config fixtures loaded end to end into DeploymentState.
// Purpose: Keep registry failure messages stable for existing configs.
// Dependencies: rt-config, rt-deployment-state
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;

use rt_config::DeploymentStateBlock;
use rt_config::RtConfig;
use rt_deployment_state::BackendKindRegistry;
use rt_deployment_state::DeploymentState;
use rt_deployment_state::InMemoryConnector;
use rt_deployment_state::MemoryBackendKind;
use rt_deployment_state::RegistryError;
use serde_json::json;

type TestResult = Result<(), String>;

fn registry() -> BackendKindRegistry {
    let mut kinds = BackendKindRegistry::with_builtin_kinds(Arc::new(InMemoryConnector::new()));
    kinds.register("fixture", Arc::new(MemoryBackendKind)).expect("fixture kind registers");
    kinds
}

fn load_backends(path: &str) -> Result<DeploymentState, String> {
    let (config, _) = RtConfig::load("", "", path).map_err(|err| err.to_string())?;
    DeploymentState::new(&registry(), &config.deployment_state).map_err(|err| err.to_string())
}

fn expect_failure(path: &str, expected: &str) -> TestResult {
    match load_backends(path) {
        Err(err) if err == expected => Ok(()),
        Err(err) => Err(format!("Errors don't match.\nExpected: {expected}\n   Given: {err}")),
        Ok(_) => Err(format!("{path}: expected failure: {expected}")),
    }
}

// ============================================================================
// SECTION: Fixture Scenarios
// ============================================================================

#[test]
fn unknown_block_fails_before_registry() -> TestResult {
    expect_failure(
        "tests/fixtures/no-deployment-state.hcl",
        r#"Failed to load config from "tests/fixtures/no-deployment-state.hcl": Unrecognised config block ("random_thing_oink"), supported: ["deployment_state" "remote_state"]"#,
    )
}

#[test]
fn unknown_block_after_backend_fails() -> TestResult {
    expect_failure(
        "tests/fixtures/unexpected-resource.hcl",
        r#"Failed to load config from "tests/fixtures/unexpected-resource.hcl": Unrecognised config block ("random_thing_oink"), supported: ["deployment_state" "remote_state"]"#,
    )
}

#[test]
fn empty_file_has_no_configuration() -> TestResult {
    expect_failure("tests/fixtures/empty-file.hcl", "No configuration provided")
}

#[test]
fn s3_without_bucket_cannot_initialize() -> TestResult {
    expect_failure(
        "tests/fixtures/uninitializable-backend.hcl",
        r#"Error initializing backend: "Unable to initalize backend with config: map["key":"//yada/"]: Missing bucket field in config""#,
    )
}

#[test]
fn unsupported_kind_is_rejected() -> TestResult {
    expect_failure(
        "tests/fixtures/unsupported-backend.hcl",
        "Defined backend something-unsupported is not supported",
    )
}

#[test]
fn repeated_kind_is_rejected() -> TestResult {
    expect_failure("tests/fixtures/double-resource.hcl", "Duplicate backend defined (fixture)")
}

#[test]
fn valid_config_builds_backends_in_order() -> TestResult {
    let state = load_backends("tests/fixtures/valid.hcl")?;
    let kinds = state.kinds();
    if kinds == ["s3", "fixture"] {
        Ok(())
    } else {
        Err(format!("unexpected kinds: {kinds:?}"))
    }
}

// ============================================================================
// SECTION: Registry Behavior
// ============================================================================

#[test]
fn empty_registry_supports_nothing() -> TestResult {
    let block = DeploymentStateBlock {
        kind: "memory".to_string(),
        config: rt_config::BackendConfig::new(),
    };
    match DeploymentState::new(&BackendKindRegistry::new(), &[block]) {
        Err(RegistryError::Unsupported {
            kind,
        }) if kind == "memory" => Ok(()),
        Err(err) => Err(format!("unexpected error: {err}")),
        Ok(_) => Err("empty registry built a backend".to_string()),
    }
}

#[test]
fn kinds_cannot_be_registered_twice() -> TestResult {
    let mut kinds = registry();
    match kinds.register("fixture", Arc::new(MemoryBackendKind)) {
        Err(RegistryError::KindAlreadyRegistered {
            kind,
        }) if kind == "fixture" => Ok(()),
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn builtin_kinds_are_listed() -> TestResult {
    let names = registry().names().join(",");
    if names == "fixture,memory,s3" {
        Ok(())
    } else {
        Err(format!("unexpected names: {names}"))
    }
}

#[test]
fn non_string_s3_fields_are_rejected() -> TestResult {
    let mut config = rt_config::BackendConfig::new();
    config.insert("bucket".to_string(), json!("state"));
    config.insert("region".to_string(), json!(42));
    let block = DeploymentStateBlock {
        kind: "s3".to_string(),
        config,
    };
    let err = DeploymentState::new(&registry(), &[block]).err().ok_or("numeric region accepted")?;
    let expected = r#"Error initializing backend: "Unable to initalize backend with config: map["bucket":"state" "region":42]: Invalid region field in config: expected a string""#;
    if err.to_string() == expected {
        Ok(())
    } else {
        Err(format!("Errors don't match.\nExpected: {expected}\n   Given: {err}"))
    }
}

#[test]
fn no_backends_are_returned_on_partial_failure() -> TestResult {
    let blocks = [
        DeploymentStateBlock {
            kind: "fixture".to_string(),
            config: rt_config::BackendConfig::new(),
        },
        DeploymentStateBlock {
            kind: "nope".to_string(),
            config: rt_config::BackendConfig::new(),
        },
    ];
    if DeploymentState::new(&registry(), &blocks).is_err() {
        Ok(())
    } else {
        Err("partial config built backends".to_string())
    }
}
