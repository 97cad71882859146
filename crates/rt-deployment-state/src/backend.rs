// crates/rt-deployment-state/src/backend.rs
// ============================================================================
// Module: Deployment State Backend Interface
// Description: Storage contract for application, slot and deployment records.
// Purpose: Let the aggregate fan out over interchangeable storage kinds.
// Dependencies: rt-config, rt-core, crate::error
// ============================================================================

//! ## Overview
//! A backend persists three record kinds keyed by application, slot and
//! deployment. Records returned from a backend have their lookup key field
//! filled in from the key they were stored under, so callers never rely on
//! the serialized body for identity. Listings are ordered by key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rt_config::BackendConfig;
use rt_core::AppName;
use rt_core::ApplicationData;
use rt_core::DeploymentData;
use rt_core::DeploymentId;
use rt_core::SlotData;
use rt_core::SlotId;

use crate::error::BackendError;

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Storage contract implemented by every deployment state kind.
pub trait Backend: Send + Sync {
    /// Kind name this backend was configured under.
    fn kind(&self) -> &str;

    /// Returns true when writes can be guarded by a lock.
    fn supports_write_lock(&self) -> bool {
        false
    }

    /// Checks that the backend can serve requests.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the store cannot be reached.
    fn is_ready(&self) -> Result<bool, BackendError>;

    /// Lists every application with a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when listing or decoding fails.
    fn list_applications(&self) -> Result<Vec<ApplicationData>, BackendError>;

    /// Reads one application.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::AppNotFound`] for a missing application.
    fn get_application(&self, app: &AppName) -> Result<ApplicationData, BackendError>;

    /// Writes one application.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when encoding or the write fails.
    fn save_application(&self, app: &AppName, data: &ApplicationData) -> Result<(), BackendError>;

    /// Lists every slot of an application.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when listing or decoding fails.
    fn list_slots(&self, app: &AppName) -> Result<Vec<SlotData>, BackendError>;

    /// Reads one slot.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::SlotNotFound`] for a missing slot.
    fn get_slot(&self, app: &AppName, slot: &SlotId) -> Result<SlotData, BackendError>;

    /// Writes one slot.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when encoding or the write fails.
    fn save_slot(&self, app: &AppName, slot: &SlotId, data: &SlotData) -> Result<(), BackendError>;

    /// Deletes one slot record. Deployment records are kept.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the delete fails.
    fn delete_slot(&self, app: &AppName, slot: &SlotId) -> Result<(), BackendError>;

    /// Lists deployments of a slot in key order, stopping after `limit`
    /// records. A `limit` of zero lists everything.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when listing or decoding fails.
    fn list_sorted_deployments(
        &self,
        app: &AppName,
        slot: &SlotId,
        limit: usize,
    ) -> Result<Vec<DeploymentData>, BackendError>;

    /// Reads one deployment.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::DeploymentNotFound`] for a missing deployment.
    fn get_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
    ) -> Result<DeploymentData, BackendError>;

    /// Writes one deployment.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when encoding or the write fails.
    fn save_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
        data: &DeploymentData,
    ) -> Result<(), BackendError>;
}

// ============================================================================
// SECTION: Backend Kinds
// ============================================================================

/// Factory turning a `deployment_state` block body into a backend.
pub trait BackendKind: Send + Sync {
    /// Builds a backend registered under `kind` from its config.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] when the config is rejected.
    fn initialize(&self, kind: &str, config: &BackendConfig) -> Result<Box<dyn Backend>, BackendError>;
}
