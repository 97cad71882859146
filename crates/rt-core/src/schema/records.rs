// crates/rt-core/src/schema/records.rs
// ============================================================================
// Module: RT State Records
// Description: Application, slot and deployment metadata records.
// Purpose: Define the in-memory shape and wire names of deployment state.
// Dependencies: serde, crate::{identifiers, schema, timestamp}
// ============================================================================

//! ## Overview
//! Wire names are fixed by records already sitting in state buckets. Lookup
//! keys (`name`, `slot_id`, `deployment_id`) are never serialized; backends
//! fill them in from the key a record was stored under. Empty maps and lists
//! written as `null` by older writers decode to empty values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use thiserror::Error;

use crate::identifiers::AppName;
use crate::identifiers::DeploymentId;
use crate::identifiers::SlotId;
use crate::schema::Migration;
use crate::schema::VersionedRecord;
use crate::schema::migrations;
use crate::timestamp::Timestamp;

// ============================================================================
// SECTION: Schema Versions
// ============================================================================

/// Current application schema version.
pub const APPLICATION_SCHEMA_VERSION: u32 = 1;
/// Current slot schema version.
pub const SLOT_SCHEMA_VERSION: u32 = 1;
/// Current deployment schema version.
pub const DEPLOYMENT_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// SECTION: Application
// ============================================================================

/// Per-application deployment state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationData {
    /// Schema version tag.
    #[serde(rename = "v")]
    pub schema_version: u32,
    /// Application name (lookup key).
    #[serde(skip)]
    pub name: AppName,
    /// Application has moved off the central infrastructure repository.
    pub use_central_git_repo: bool,
    /// Application is deployed and live.
    pub is_active: bool,
    /// Outputs of the shared infrastructure run.
    #[serde(deserialize_with = "null_as_default")]
    pub infra_outputs: BTreeMap<String, String>,
    /// RT version used for the last deployment.
    #[serde(deserialize_with = "null_as_default")]
    pub last_rt_version: String,
    /// Terraform version used for the last deployment.
    #[serde(deserialize_with = "null_as_default")]
    pub last_terraform_version: String,
    /// Last deployment instant.
    #[serde(skip_serializing_if = "Timestamp::is_zero")]
    pub last_deployment_time: Timestamp,
    /// Last infrastructure change instant.
    pub last_infra_change_time: Timestamp,
    /// Monotonic counters per slot prefix.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "null_as_default")]
    pub slot_counters: BTreeMap<String, i64>,
}

impl ApplicationData {
    /// Returns the counter for a slot prefix, if one exists.
    #[must_use]
    pub fn slot_counter(&self, prefix: &str) -> Option<i64> {
        self.slot_counters.get(prefix).copied()
    }

    /// Adds a counter for a slot prefix, starting at zero.
    ///
    /// # Errors
    ///
    /// Returns [`SlotCounterError::Exists`] when the prefix already has a counter.
    pub fn add_slot_counter(&mut self, prefix: &str) -> Result<(), SlotCounterError> {
        if let Some(value) = self.slot_counter(prefix) {
            return Err(SlotCounterError::Exists {
                prefix: prefix.to_string(),
                value,
            });
        }
        self.slot_counters.insert(prefix.to_string(), 0);
        Ok(())
    }

    /// Increments the counter for a slot prefix and returns the new value.
    /// A missing counter starts from zero.
    pub fn increment_slot_counter(&mut self, prefix: &str) -> i64 {
        let counter = self.slot_counters.entry(prefix.to_string()).or_insert(0);
        *counter = counter.saturating_add(1);
        *counter
    }

    /// Removes the counter for a slot prefix.
    ///
    /// # Errors
    ///
    /// Returns [`SlotCounterError::Missing`] when the prefix has no counter.
    pub fn delete_slot_counter(&mut self, prefix: &str) -> Result<(), SlotCounterError> {
        self.slot_counters.remove(prefix).map(|_| ()).ok_or_else(|| SlotCounterError::Missing {
            prefix: prefix.to_string(),
        })
    }
}

/// Slot counter bookkeeping failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotCounterError {
    /// Counter already present.
    #[error("Slot counter {prefix} already exists (current value: {value})")]
    Exists {
        /// Slot prefix.
        prefix: String,
        /// Current counter value.
        value: i64,
    },
    /// Counter absent.
    #[error("Slot counter with prefix {prefix} does not exist")]
    Missing {
        /// Slot prefix.
        prefix: String,
    },
}

impl VersionedRecord for ApplicationData {
    const KIND: &'static str = "application";
    const CURRENT_VERSION: u32 = APPLICATION_SCHEMA_VERSION;
    const MIGRATIONS: &'static [Migration] = migrations::APPLICATION;

    fn set_schema_version(&mut self, version: u32) {
        self.schema_version = version;
    }
}

// ============================================================================
// SECTION: Slot
// ============================================================================

/// Per-slot deployment state (one slot is one provisioner state file).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotData {
    /// Schema version tag.
    #[serde(rename = "v")]
    pub schema_version: u32,
    /// Slot identifier (lookup key).
    #[serde(skip)]
    pub slot_id: SlotId,
    /// Slot is deployed and live.
    pub is_active: bool,
    /// Start of the last deployment into this slot.
    pub last_deployment_start_time: Timestamp,
    /// Who ran the last deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deploy_pilot: Option<DeployPilot>,
    /// Last provisioner run; written as `null` when absent.
    pub last_terraform_run: Option<TerraformRun>,
}

impl VersionedRecord for SlotData {
    const KIND: &'static str = "slot";
    const CURRENT_VERSION: u32 = SLOT_SCHEMA_VERSION;
    const MIGRATIONS: &'static [Migration] = migrations::SLOT;

    fn set_schema_version(&mut self, version: u32) {
        self.schema_version = version;
    }
}

// ============================================================================
// SECTION: Deployment
// ============================================================================

/// A single deployment into a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentData {
    /// Schema version tag.
    #[serde(rename = "v")]
    pub schema_version: u32,
    /// Deployment identifier (lookup key).
    #[serde(skip)]
    pub deployment_id: DeploymentId,
    /// Who ran the deployment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_pilot: Option<DeployPilot>,
    /// Deployment start instant.
    pub start_time: Timestamp,
    /// Provisioner run details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terraform: Option<TerraformRun>,
    /// RT version that ran the deployment.
    #[serde(deserialize_with = "null_as_default")]
    pub rt_version: String,
}

impl VersionedRecord for DeploymentData {
    const KIND: &'static str = "deployment";
    const CURRENT_VERSION: u32 = DEPLOYMENT_SCHEMA_VERSION;
    const MIGRATIONS: &'static [Migration] = migrations::DEPLOYMENT;

    fn set_schema_version(&mut self, version: u32) {
        self.schema_version = version;
    }
}

// ============================================================================
// SECTION: Shared Descriptors
// ============================================================================

/// Identity and network location of whoever started a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployPilot {
    /// Caller ARN as reported by the cloud identity service.
    pub aws_api_caller: String,
    /// Caller IP address.
    pub ip_address: String,
}

/// Provisioner run descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformRun {
    /// Plan start.
    pub plan_start_time: Timestamp,
    /// Plan finish.
    pub plan_finish_time: Timestamp,
    /// Apply start.
    pub start_time: Timestamp,
    /// Apply finish.
    pub finish_time: Timestamp,
    /// Run destroyed resources.
    pub is_destroy: bool,
    /// Resource change counters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_diff: Option<ResourceDiff>,
    /// Input variables.
    #[serde(deserialize_with = "null_as_default")]
    pub variables: BTreeMap<String, String>,
    /// Outputs after the run.
    #[serde(deserialize_with = "null_as_default")]
    pub outputs: BTreeMap<String, String>,
    /// Provisioner version.
    #[serde(deserialize_with = "null_as_default")]
    pub terraform_version: String,
    /// Process exit code.
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
    /// Warnings scraped from the run output.
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
    /// Captured standard error.
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub stderr: String,
}

impl TerraformRun {
    /// Copies the results of a finished run into this descriptor.
    pub fn apply_finished(&mut self, finished: FinishedTerraformRun) {
        self.plan_start_time = finished.plan_start_time;
        self.plan_finish_time = finished.plan_finish_time;
        self.start_time = finished.start_time;
        self.finish_time = finished.finish_time;
        self.resource_diff = finished.resource_diff;
        self.outputs = finished.outputs;
        self.exit_code = finished.exit_code;
        self.warnings = finished.warnings;
        self.stderr = finished.stderr;
    }
}

/// Results reported by the provisioner once a run has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinishedTerraformRun {
    /// Plan start.
    pub plan_start_time: Timestamp,
    /// Plan finish.
    pub plan_finish_time: Timestamp,
    /// Apply start.
    pub start_time: Timestamp,
    /// Apply finish.
    pub finish_time: Timestamp,
    /// Resource change counters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_diff: Option<ResourceDiff>,
    /// Outputs after the run.
    #[serde(deserialize_with = "null_as_default")]
    pub outputs: BTreeMap<String, String>,
    /// Process exit code.
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
    /// Warnings scraped from the run output.
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub warnings: Vec<String>,
    /// Captured standard error.
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub stderr: String,
}

/// Resource change counters from a plan or apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ResourceDiff {
    /// Resources created.
    #[serde(alias = "created")]
    pub created: u64,
    /// Resources removed.
    #[serde(alias = "removed")]
    pub removed: u64,
    /// Resources changed in place.
    #[serde(alias = "changed")]
    pub changed: u64,
}

// ============================================================================
// SECTION: Serde Helpers
// ============================================================================

/// Decodes `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Matches exit codes that are omitted on the wire.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "Signature required by serde.")]
const fn is_zero(value: &i32) -> bool {
    *value == 0
}
