// crates/rt-core/src/schema/migrations.rs
// ============================================================================
// Module: RT Schema Migrations
// Description: Per-kind migration tables for stored records.
// Purpose: Lift records written by older RT releases to the current schema.
// Dependencies: serde_json, crate::schema
// ============================================================================

//! ## Overview
//! Tables are append-only. A step may only rely on fields that existed at
//! the version it accepts, and must tolerate any of them being absent.
//! The v0 to v1 steps raise `v` and replace `null` maps and lists with
//! empty values.

use serde_json::Map;
use serde_json::Value;

use crate::schema::Migration;
use crate::schema::SCHEMA_VERSION_KEY;

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Application migrations.
pub const APPLICATION: &[Migration] = &[Migration {
    from: 0,
    apply: application_v0_to_v1,
}];

/// Slot migrations.
pub const SLOT: &[Migration] = &[Migration {
    from: 0,
    apply: slot_v0_to_v1,
}];

/// Deployment migrations.
pub const DEPLOYMENT: &[Migration] = &[Migration {
    from: 0,
    apply: deployment_v0_to_v1,
}];

// ============================================================================
// SECTION: v0 -> v1
// ============================================================================

/// Application v0 to v1.
fn application_v0_to_v1(mut record: Map<String, Value>) -> Result<Map<String, Value>, String> {
    fill_null(&mut record, "infra_outputs", Value::Object(Map::new()));
    fill_null(&mut record, "slot_counters", Value::Object(Map::new()));
    record.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(1_u32));
    Ok(record)
}

/// Slot v0 to v1.
fn slot_v0_to_v1(mut record: Map<String, Value>) -> Result<Map<String, Value>, String> {
    if let Some(run) = record.get_mut("last_terraform_run") {
        normalize_terraform_run(run)?;
    }
    record.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(1_u32));
    Ok(record)
}

/// Deployment v0 to v1.
fn deployment_v0_to_v1(mut record: Map<String, Value>) -> Result<Map<String, Value>, String> {
    if let Some(run) = record.get_mut("terraform") {
        normalize_terraform_run(run)?;
    }
    record.insert(SCHEMA_VERSION_KEY.to_string(), Value::from(1_u32));
    Ok(record)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Normalizes a v0 provisioner-run descriptor in place.
fn normalize_terraform_run(run: &mut Value) -> Result<(), String> {
    match run {
        Value::Null => Ok(()),
        Value::Object(fields) => {
            fill_null(fields, "variables", Value::Object(Map::new()));
            fill_null(fields, "outputs", Value::Object(Map::new()));
            fill_null(fields, "warnings", Value::Array(Vec::new()));
            Ok(())
        }
        _ => Err("terraform run is not a JSON object".to_string()),
    }
}

/// Replaces an explicit `null` under `key`; absent keys stay absent.
fn fill_null(record: &mut Map<String, Value>, key: &str, empty: Value) {
    if let Some(value) = record.get_mut(key)
        && value.is_null()
    {
        *value = empty;
    }
}
