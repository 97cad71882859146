//! Record helper tests for rt-core.
// crates/rt-core/tests/records.rs
// ============================================================================
// Module: Record Helper Tests
// Description: Slot counters, finished-run copying and deployment ids.
// Purpose: Pin the bookkeeping used by deployment orchestration.
// Dependencies: rt-core, time
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
use rt_core::DeploymentId;
use rt_core::FinishedTerraformRun;
use rt_core::ResourceDiff;
use rt_core::SlotCounterError;
use rt_core::TerraformRun;
use rt_core::Timestamp;
use time::macros::datetime;

type TestResult = Result<(), String>;

// ============================================================================
// SECTION: Slot Counters
// ============================================================================

#[test]
fn slot_counter_lifecycle() -> TestResult {
    let mut app = ApplicationData::default();
    app.add_slot_counter("pr").map_err(|err| err.to_string())?;
    if app.slot_counter("pr") != Some(0) {
        return Err("new counter should start at zero".to_string());
    }
    if app.increment_slot_counter("pr") != 1 || app.increment_slot_counter("pr") != 2 {
        return Err("increment did not count up".to_string());
    }
    app.delete_slot_counter("pr").map_err(|err| err.to_string())?;
    if app.slot_counter("pr").is_some() {
        return Err("counter survived delete".to_string());
    }
    Ok(())
}

#[test]
fn adding_existing_counter_reports_value() -> TestResult {
    let mut app = ApplicationData::default();
    app.slot_counters.insert("pr".to_string(), 7);
    match app.add_slot_counter("pr") {
        Err(err @ SlotCounterError::Exists { .. }) => {
            let message = err.to_string();
            if message == "Slot counter pr already exists (current value: 7)" {
                Ok(())
            } else {
                Err(format!("unexpected message: {message}"))
            }
        }
        other => Err(format!("unexpected result: {other:?}")),
    }
}

#[test]
fn deleting_missing_counter_fails() -> TestResult {
    let mut app = ApplicationData::default();
    let err = app.delete_slot_counter("pr").err().ok_or("delete succeeded")?;
    if err.to_string() == "Slot counter with prefix pr does not exist" {
        Ok(())
    } else {
        Err(format!("unexpected message: {err}"))
    }
}

#[test]
fn incrementing_missing_counter_starts_at_one() -> TestResult {
    let mut app = ApplicationData::default();
    if app.increment_slot_counter("feature") == 1 {
        Ok(())
    } else {
        Err("missing counter should start from zero".to_string())
    }
}

// ============================================================================
// SECTION: Terraform Runs
// ============================================================================

#[test]
fn finished_run_overwrites_result_fields_only() -> TestResult {
    let mut run = TerraformRun {
        is_destroy: true,
        terraform_version: "1.5.7".to_string(),
        variables: BTreeMap::from([("env".to_string(), "test".to_string())]),
        ..TerraformRun::default()
    };
    let finish = Timestamp::from_datetime(datetime!(2024-03-01 12:30 UTC));
    run.apply_finished(FinishedTerraformRun {
        finish_time: finish,
        resource_diff: Some(ResourceDiff {
            created: 2,
            removed: 0,
            changed: 1,
        }),
        exit_code: 1,
        warnings: vec!["deprecated".to_string()],
        stderr: "boom".to_string(),
        ..FinishedTerraformRun::default()
    });
    if !run.is_destroy || run.terraform_version != "1.5.7" || run.variables.len() != 1 {
        return Err(format!("start fields were lost: {run:?}"));
    }
    if run.finish_time != finish || run.exit_code != 1 || run.stderr != "boom" {
        return Err(format!("finish fields were not copied: {run:?}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Deployment Identifiers
// ============================================================================

#[test]
fn deployment_ids_are_reversed_and_padded() -> TestResult {
    let id = DeploymentId::from_start_time(Timestamp::from_datetime(datetime!(1970-01-01 0:00:10 UTC)));
    if id.as_str() != "09223372036854775797" {
        return Err(format!("unexpected id: {id}"));
    }
    Ok(())
}

#[test]
fn later_deployments_sort_first() -> TestResult {
    let earlier = DeploymentId::from_start_time(Timestamp::from_datetime(datetime!(2024-01-01 0:00 UTC)));
    let later = DeploymentId::from_start_time(Timestamp::from_datetime(datetime!(2024-06-01 0:00 UTC)));
    if later < earlier && later.as_str().len() == 20 && earlier.as_str().len() == 20 {
        Ok(())
    } else {
        Err(format!("unexpected ordering: {earlier} / {later}"))
    }
}

#[test]
fn derived_ids_are_well_formed() -> TestResult {
    let id = DeploymentId::from_start_time(Timestamp::from_datetime(datetime!(2024-01-01 0:00 UTC)));
    if !DeploymentId::is_well_formed(id.as_str()) {
        return Err(format!("derived id rejected: {id}"));
    }
    for text in ["2-09223372035000000001", "42", "0922337203685477579a", ""] {
        if DeploymentId::is_well_formed(text) {
            return Err(format!("accepted malformed id {text:?}"));
        }
    }
    Ok(())
}
