//! Versioned record codec tests for rt-core.
// crates/rt-core/tests/schema.rs
// ============================================================================
// Module: Record Codec Tests
// Description: Encode/decode, version gating and v0 migrations.
// Purpose: Keep stored deployment state readable across RT releases.
// Dependencies: rt-core, serde_json
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

use std::collections::BTreeMap;

use rt_core::ApplicationData;
use rt_core::DeployPilot;
use rt_core::DeploymentData;
use rt_core::ResourceDiff;
use rt_core::SchemaError;
use rt_core::SlotData;
use rt_core::TerraformRun;
use rt_core::Timestamp;
use rt_core::VersionedRecord;
use rt_core::schema::Migration;
use rt_core::schema::SchemaTransition;
use serde_json::Value;
use serde_json::json;

type TestResult = Result<(), String>;

const APPLICATION_V0: &str = include_str!("fixtures/application_v0.json");
const SLOT_V0: &str = include_str!("fixtures/slot_v0.json");
const DEPLOYMENT_V0: &str = include_str!("fixtures/deployment_v0.json");
const APPLICATION_UNVERSIONED: &str = include_str!("fixtures/application_unversioned.json");

fn ts(text: &str) -> Result<Timestamp, String> {
    Timestamp::parse(text).map_err(|err| err.to_string())
}

fn to_value(bytes: &[u8]) -> Result<Value, String> {
    serde_json::from_slice(bytes).map_err(|err| err.to_string())
}

/// Parses a v0 fixture and returns it with `v` raised to 1.
fn expected_v1(fixture: &str) -> Result<Value, String> {
    let mut value: Value = serde_json::from_str(fixture).map_err(|err| err.to_string())?;
    let object = value.as_object_mut().ok_or("fixture is not an object")?;
    object.insert("v".to_string(), json!(1));
    Ok(value)
}

fn sample_run() -> Result<TerraformRun, String> {
    Ok(TerraformRun {
        plan_start_time: ts("2016-09-12T13:51:54.799975226Z")?,
        plan_finish_time: ts("2016-09-12T13:52:01.326031911Z")?,
        start_time: ts("2016-09-12T13:52:14.828070419Z")?,
        finish_time: ts("2016-09-12T13:53:49.447318858Z")?,
        is_destroy: false,
        resource_diff: Some(ResourceDiff {
            created: 5,
            removed: 1,
            changed: 2,
        }),
        variables: BTreeMap::from([("app_name".to_string(), "git_cop".to_string())]),
        outputs: BTreeMap::from([("team".to_string(), "devops".to_string())]),
        terraform_version: "0.6.16".to_string(),
        exit_code: 1,
        warnings: vec!["deprecated attribute".to_string()],
        stderr: "boom".to_string(),
    })
}

// ============================================================================
// SECTION: Round Trips
// ============================================================================

#[test]
fn application_round_trip_stamps_version() -> TestResult {
    let mut record = ApplicationData {
        name: "git-cop".into(),
        use_central_git_repo: true,
        is_active: true,
        infra_outputs: BTreeMap::from([("one".to_string(), "1111".to_string())]),
        last_rt_version: "0.9.3".to_string(),
        last_terraform_version: "0.6.16".to_string(),
        last_deployment_time: ts("2016-03-30T15:04:05+01:00")?,
        last_infra_change_time: ts("2016-03-30T15:04:05+01:00")?,
        slot_counters: BTreeMap::from([("stable".to_string(), 1234)]),
        ..ApplicationData::default()
    };
    let bytes = record.to_json().map_err(|err| err.to_string())?;
    let value = to_value(&bytes)?;
    if value["v"] != json!(1) || value.get("name").is_some() {
        return Err(format!("unexpected encoding: {value}"));
    }
    let decoded = ApplicationData::from_json(&bytes).map_err(|err| err.to_string())?;
    let expected = ApplicationData {
        name: Default::default(),
        ..record
    };
    if decoded != expected {
        return Err("application did not round-trip".to_string());
    }
    Ok(())
}

#[test]
fn application_omits_zero_time_and_empty_counters() -> TestResult {
    let mut record = ApplicationData::default();
    let value = to_value(&record.to_json().map_err(|err| err.to_string())?)?;
    let object = value.as_object().ok_or("not an object")?;
    if object.contains_key("last_deployment_time") || object.contains_key("slot_counters") {
        return Err(format!("zero fields were written: {value}"));
    }
    if object.get("last_infra_change_time") != Some(&json!("0001-01-01T00:00:00Z")) {
        return Err(format!("zero instant not written: {value}"));
    }
    Ok(())
}

#[test]
fn slot_round_trip_with_run() -> TestResult {
    let mut record = SlotData {
        is_active: true,
        last_deployment_start_time: ts("2016-09-12T13:52:12.853050642Z")?,
        last_deploy_pilot: Some(DeployPilot {
            aws_api_caller: "arn:aws:iam::123456789012:user/pilot".to_string(),
            ip_address: "8.8.8.8".to_string(),
        }),
        last_terraform_run: Some(sample_run()?),
        ..SlotData::default()
    };
    let bytes = record.to_json().map_err(|err| err.to_string())?;
    let value = to_value(&bytes)?;
    let diff = &value["last_terraform_run"]["resource_diff"];
    if diff != &json!({"Created": 5, "Removed": 1, "Changed": 2}) {
        return Err(format!("unexpected resource diff: {diff}"));
    }
    let decoded = SlotData::from_json(&bytes).map_err(|err| err.to_string())?;
    if decoded != record {
        return Err("slot did not round-trip".to_string());
    }
    Ok(())
}

#[test]
fn slot_without_run_writes_null_and_omits_pilot() -> TestResult {
    let mut record = SlotData::default();
    let value = to_value(&record.to_json().map_err(|err| err.to_string())?)?;
    let object = value.as_object().ok_or("not an object")?;
    if object.get("last_terraform_run") != Some(&Value::Null) {
        return Err(format!("missing null run: {value}"));
    }
    if object.contains_key("last_deploy_pilot") {
        return Err(format!("absent pilot was written: {value}"));
    }
    Ok(())
}

#[test]
fn deployment_round_trip_omits_empty_run_fields() -> TestResult {
    let run = TerraformRun {
        exit_code: 0,
        warnings: Vec::new(),
        stderr: String::new(),
        resource_diff: None,
        ..sample_run()?
    };
    let mut record = DeploymentData {
        deployment_id: "20160912135212".into(),
        start_time: ts("2016-09-12T13:52:12Z")?,
        terraform: Some(run),
        rt_version: "0.9.3".to_string(),
        ..DeploymentData::default()
    };
    let bytes = record.to_json().map_err(|err| err.to_string())?;
    let value = to_value(&bytes)?;
    let terraform = value["terraform"].as_object().ok_or("terraform missing")?;
    for key in ["exit_code", "warnings", "stderr", "resource_diff"] {
        if terraform.contains_key(key) {
            return Err(format!("{key} should be omitted: {value}"));
        }
    }
    if value.get("deploy_pilot").is_some() {
        return Err(format!("absent pilot was written: {value}"));
    }
    let decoded = DeploymentData::from_json(&bytes).map_err(|err| err.to_string())?;
    if !decoded.deployment_id.as_str().is_empty() || decoded.terraform != record.terraform {
        return Err("deployment did not round-trip".to_string());
    }
    Ok(())
}

#[test]
fn lowercase_resource_diff_keys_are_accepted() -> TestResult {
    let data = br#"{"v":1,"start_time":"2016-09-12T13:52:12Z","terraform":{"resource_diff":{"created":3,"removed":2,"changed":1}},"rt_version":"0.9.3"}"#;
    let decoded = DeploymentData::from_json(data).map_err(|err| err.to_string())?;
    let diff = decoded.terraform.and_then(|run| run.resource_diff);
    if diff
        != Some(ResourceDiff {
            created: 3,
            removed: 2,
            changed: 1,
        })
    {
        return Err("lowercase diff keys not decoded".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Version Gating
// ============================================================================

#[test]
fn newer_versions_ask_for_upgrade() -> TestResult {
    let cases: [(&str, Result<(), SchemaError>); 3] = [
        ("application", ApplicationData::from_json(br#"{"v":2}"#).map(|_| ())),
        ("slot", SlotData::from_json(br#"{"v":2}"#).map(|_| ())),
        ("deployment", DeploymentData::from_json(br#"{"v":99999}"#).map(|_| ())),
    ];
    for (kind, result) in cases {
        let err = result.err().ok_or_else(|| format!("{kind}: newer version accepted"))?;
        let message = err.to_string();
        if !message.starts_with(&format!("Failed to process {kind} data (schema v"))
            || !message.ends_with("Please upgrade RT.")
        {
            return Err(format!("unexpected message: {message}"));
        }
    }
    Ok(())
}

#[test]
fn upgrade_message_is_exact() -> TestResult {
    let err = ApplicationData::from_json(br#"{"v":2,"is_active":true}"#)
        .err()
        .ok_or("v2 accepted")?;
    if err.to_string() == "Failed to process application data (schema v2). Please upgrade RT." {
        Ok(())
    } else {
        Err(format!("unexpected message: {err}"))
    }
}

#[test]
fn malformed_input_is_a_decode_error() -> TestResult {
    let inputs: [&[u8]; 4] =
        [b"not json", br"[1,2]", br#"{"v":"one"}"#, br#"{"v":1,"is_active":"yes"}"#];
    for data in inputs {
        match SlotData::from_json(data) {
            Err(SchemaError::Decode { kind: "slot", .. }) => {}
            other => return Err(format!("unexpected result: {:?}", other.map(|_| ()))),
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Migrations
// ============================================================================

#[test]
fn application_v0_migrates_to_v1() -> TestResult {
    let mut record =
        ApplicationData::from_json(APPLICATION_V0.as_bytes()).map_err(|err| err.to_string())?;
    if record.schema_version != 1 {
        return Err(format!("expected schema v1, v{} given", record.schema_version));
    }
    let migrated = to_value(&record.to_json().map_err(|err| err.to_string())?)?;
    if migrated != expected_v1(APPLICATION_V0)? {
        return Err(format!("unexpected data after migration: {migrated}"));
    }
    Ok(())
}

#[test]
fn slot_v0_migrates_to_v1() -> TestResult {
    let mut record = SlotData::from_json(SLOT_V0.as_bytes()).map_err(|err| err.to_string())?;
    if record.schema_version != 1 {
        return Err(format!("expected schema v1, v{} given", record.schema_version));
    }
    let migrated = to_value(&record.to_json().map_err(|err| err.to_string())?)?;
    if migrated != expected_v1(SLOT_V0)? {
        return Err(format!("unexpected data after migration: {migrated}"));
    }
    Ok(())
}

#[test]
fn deployment_v0_migrates_to_v1() -> TestResult {
    let mut record =
        DeploymentData::from_json(DEPLOYMENT_V0.as_bytes()).map_err(|err| err.to_string())?;
    if record.schema_version != 1 {
        return Err(format!("expected schema v1, v{} given", record.schema_version));
    }
    let migrated = to_value(&record.to_json().map_err(|err| err.to_string())?)?;
    if migrated != expected_v1(DEPLOYMENT_V0)? {
        return Err(format!("unexpected data after migration: {migrated}"));
    }
    Ok(())
}

#[test]
fn unversioned_records_are_treated_as_v0() -> TestResult {
    let record = ApplicationData::from_json(APPLICATION_UNVERSIONED.as_bytes())
        .map_err(|err| err.to_string())?;
    if record.schema_version != 1
        || !record.infra_outputs.is_empty()
        || !record.slot_counters.is_empty()
        || record.last_rt_version != "0.3.0"
        || !record.last_deployment_time.is_zero()
    {
        return Err("unversioned record decoded incorrectly".to_string());
    }
    Ok(())
}

#[test]
fn v0_run_with_null_lists_is_normalized() -> TestResult {
    let data = br#"{"v":0,"start_time":"2016-09-12T13:52:12Z","terraform":{"variables":null,"outputs":null,"warnings":null},"rt_version":"0.5.0"}"#;
    let record = DeploymentData::from_json(data).map_err(|err| err.to_string())?;
    let run = record.terraform.ok_or("terraform run dropped")?;
    if !run.variables.is_empty() || !run.outputs.is_empty() || !run.warnings.is_empty() {
        return Err("null collections not normalized".to_string());
    }
    Ok(())
}

#[test]
fn v0_run_that_is_not_an_object_fails_migration() -> TestResult {
    match SlotData::from_json(br#"{"v":0,"last_terraform_run":42}"#) {
        Err(SchemaError::Migration {
            kind: "slot",
            from: 0,
            to: 1,
            ..
        }) => Ok(()),
        other => Err(format!("unexpected result: {:?}", other.map(|_| ()))),
    }
}

// ============================================================================
// SECTION: Missing Migrations
// ============================================================================

/// Record kind whose table stops short of the current version.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct GappedRecord {
    /// Schema version tag.
    #[serde(default)]
    v: u32,
}

fn gapped_v0_to_v1(
    mut record: serde_json::Map<String, Value>,
) -> Result<serde_json::Map<String, Value>, String> {
    record.insert("v".to_string(), json!(1));
    Ok(record)
}

const GAPPED_MIGRATIONS: &[Migration] = &[Migration {
    from: 0,
    apply: gapped_v0_to_v1,
}];

impl VersionedRecord for GappedRecord {
    const KIND: &'static str = "gapped";
    const CURRENT_VERSION: u32 = 3;
    const MIGRATIONS: &'static [Migration] = GAPPED_MIGRATIONS;

    fn set_schema_version(&mut self, version: u32) {
        self.v = version;
    }
}

#[test]
fn classify_reports_versions_without_a_step() -> TestResult {
    match SchemaTransition::classify(2, 3, GAPPED_MIGRATIONS) {
        SchemaTransition::Unmigratable(2) => {}
        _ => return Err("v2 should be unmigratable".to_string()),
    }
    match SchemaTransition::classify(0, 1, &[]) {
        SchemaTransition::Unmigratable(0) => Ok(()),
        _ => Err("empty table should leave v0 unmigratable".to_string()),
    }
}

#[test]
fn decoding_stops_where_the_migration_table_ends() -> TestResult {
    let err = GappedRecord::from_json(br#"{"v":0}"#).err().ok_or("decode succeeded")?;
    if err
        != (SchemaError::MissingMigration {
            kind: "gapped",
            version: 1,
        })
    {
        return Err(format!("unexpected error: {err}"));
    }
    if err.to_string() == "No migrations available for gapped schema v1" {
        Ok(())
    } else {
        Err(format!("unexpected message: {err}"))
    }
}

#[test]
fn version_between_steps_is_unmigratable() -> TestResult {
    let err = GappedRecord::from_json(br#"{"v":2}"#).err().ok_or("decode succeeded")?;
    if err.to_string() == "No migrations available for gapped schema v2" {
        Ok(())
    } else {
        Err(format!("unexpected message: {err}"))
    }
}
