// crates/rt-deployment-state/src/backends/memory.rs
// ============================================================================
// Module: In-Memory Deployment State Backend
// Description: Process-local backend storing encoded records in maps.
// Purpose: Provide a config-free kind for tests, fixtures and dry runs.
// Dependencies: rt-config, rt-core, crate::{backend, error}
// ============================================================================

//! ## Overview
//! Records are kept encoded, exactly as a durable backend would hold them,
//! so every read goes through the versioned codec. State lives as long as
//! the backend value and is not shared between initializations.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rt_config::BackendConfig;
use rt_core::AppName;
use rt_core::ApplicationData;
use rt_core::DeploymentData;
use rt_core::DeploymentId;
use rt_core::SlotData;
use rt_core::SlotId;
use rt_core::VersionedRecord;

use crate::backend::Backend;
use crate::backend::BackendKind;
use crate::error::BackendError;

// ============================================================================
// SECTION: Storage
// ============================================================================

/// Encoded records of one application.
#[derive(Debug, Default)]
struct AppEntry {
    /// Application record, absent until first saved.
    application: Option<Vec<u8>>,
    /// Slot records.
    slots: BTreeMap<SlotId, Vec<u8>>,
    /// Deployment records per slot.
    deployments: BTreeMap<SlotId, BTreeMap<DeploymentId, Vec<u8>>>,
}

/// In-memory deployment state backend.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    /// Kind name this backend was configured under.
    kind: String,
    /// Applications keyed by name.
    apps: Arc<Mutex<BTreeMap<AppName, AppEntry>>>,
}

impl MemoryBackend {
    /// Creates an empty backend reporting `kind`.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            apps: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Locks the application map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<AppName, AppEntry>>, BackendError> {
        self.apps
            .lock()
            .map_err(|_| BackendError::Store("memory backend mutex poisoned".to_string()))
    }
}

/// Encodes a record, labelling failures with `key`.
fn encode<R: VersionedRecord + Clone>(key: String, record: &R) -> Result<Vec<u8>, BackendError> {
    record.clone().to_json().map_err(|source| BackendError::Record {
        key,
        source,
    })
}

/// Decodes a record, labelling failures with `key`.
fn decode<R: VersionedRecord>(key: String, bytes: &[u8]) -> Result<R, BackendError> {
    R::from_json(bytes).map_err(|source| BackendError::Record {
        key,
        source,
    })
}

/// Decodes an application record and fills in its name.
fn decode_application(app: &AppName, bytes: &[u8]) -> Result<ApplicationData, BackendError> {
    let mut data: ApplicationData = decode(format!("{app}/APPLICATION"), bytes)?;
    data.name = app.clone();
    Ok(data)
}

/// Decodes a slot record and fills in its identifier.
fn decode_slot(app: &AppName, slot: &SlotId, bytes: &[u8]) -> Result<SlotData, BackendError> {
    let mut data: SlotData = decode(format!("{app}/SLOT-{slot}"), bytes)?;
    data.slot_id = slot.clone();
    Ok(data)
}

/// Decodes a deployment record and fills in its identifier.
fn decode_deployment(
    app: &AppName,
    slot: &SlotId,
    deployment: &DeploymentId,
    bytes: &[u8],
) -> Result<DeploymentData, BackendError> {
    let mut data: DeploymentData = decode(format!("{app}/DEPLOYMENT-{slot}-{deployment}"), bytes)?;
    data.deployment_id = deployment.clone();
    Ok(data)
}

// ============================================================================
// SECTION: Backend Implementation
// ============================================================================

impl Backend for MemoryBackend {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn is_ready(&self) -> Result<bool, BackendError> {
        self.lock().map(|_| true)
    }

    fn list_applications(&self) -> Result<Vec<ApplicationData>, BackendError> {
        let apps = self.lock()?;
        let mut listed = Vec::new();
        for (app, entry) in apps.iter() {
            if let Some(bytes) = &entry.application {
                listed.push(decode_application(app, bytes)?);
            }
        }
        Ok(listed)
    }

    fn get_application(&self, app: &AppName) -> Result<ApplicationData, BackendError> {
        let apps = self.lock()?;
        let bytes = apps
            .get(app)
            .and_then(|entry| entry.application.as_deref())
            .ok_or_else(|| BackendError::AppNotFound {
                app: app.to_string(),
            })?;
        decode_application(app, bytes)
    }

    fn save_application(&self, app: &AppName, data: &ApplicationData) -> Result<(), BackendError> {
        let bytes = encode(format!("{app}/APPLICATION"), data)?;
        self.lock()?.entry(app.clone()).or_default().application = Some(bytes);
        Ok(())
    }

    fn list_slots(&self, app: &AppName) -> Result<Vec<SlotData>, BackendError> {
        let apps = self.lock()?;
        let Some(entry) = apps.get(app) else {
            return Ok(Vec::new());
        };
        let mut listed = Vec::with_capacity(entry.slots.len());
        for (slot, bytes) in &entry.slots {
            listed.push(decode_slot(app, slot, bytes)?);
        }
        Ok(listed)
    }

    fn get_slot(&self, app: &AppName, slot: &SlotId) -> Result<SlotData, BackendError> {
        let apps = self.lock()?;
        let bytes = apps.get(app).and_then(|entry| entry.slots.get(slot)).ok_or_else(|| {
            BackendError::SlotNotFound {
                slot: slot.to_string(),
            }
        })?;
        decode_slot(app, slot, bytes)
    }

    fn save_slot(&self, app: &AppName, slot: &SlotId, data: &SlotData) -> Result<(), BackendError> {
        let bytes = encode(format!("{app}/SLOT-{slot}"), data)?;
        self.lock()?.entry(app.clone()).or_default().slots.insert(slot.clone(), bytes);
        Ok(())
    }

    fn delete_slot(&self, app: &AppName, slot: &SlotId) -> Result<(), BackendError> {
        if let Some(entry) = self.lock()?.get_mut(app) {
            entry.slots.remove(slot);
        }
        Ok(())
    }

    fn list_sorted_deployments(
        &self,
        app: &AppName,
        slot: &SlotId,
        limit: usize,
    ) -> Result<Vec<DeploymentData>, BackendError> {
        let apps = self.lock()?;
        let Some(deployments) = apps.get(app).and_then(|entry| entry.deployments.get(slot)) else {
            return Ok(Vec::new());
        };
        let take = if limit == 0 { deployments.len() } else { limit };
        let mut listed = Vec::new();
        for (deployment, bytes) in deployments.iter().take(take) {
            listed.push(decode_deployment(app, slot, deployment, bytes)?);
        }
        Ok(listed)
    }

    fn get_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
    ) -> Result<DeploymentData, BackendError> {
        let apps = self.lock()?;
        let bytes = apps
            .get(app)
            .and_then(|entry| entry.deployments.get(slot))
            .and_then(|deployments| deployments.get(deployment))
            .ok_or_else(|| BackendError::DeploymentNotFound {
                deployment: deployment.to_string(),
            })?;
        decode_deployment(app, slot, deployment, bytes)
    }

    fn save_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
        data: &DeploymentData,
    ) -> Result<(), BackendError> {
        let bytes = encode(format!("{app}/DEPLOYMENT-{slot}-{deployment}"), data)?;
        self.lock()?
            .entry(app.clone())
            .or_default()
            .deployments
            .entry(slot.clone())
            .or_default()
            .insert(deployment.clone(), bytes);
        Ok(())
    }
}

// ============================================================================
// SECTION: Backend Kind
// ============================================================================

/// Kind building [`MemoryBackend`] values. Accepts and ignores any config.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackendKind;

impl BackendKind for MemoryBackendKind {
    fn initialize(&self, kind: &str, config: &BackendConfig) -> Result<Box<dyn Backend>, BackendError> {
        if !config.is_empty() {
            tracing::debug!(kind, fields = config.len(), "memory backend ignores config");
        }
        Ok(Box::new(MemoryBackend::new(kind)))
    }
}
