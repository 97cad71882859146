// crates/rt-deployment-state/src/backends/s3.rs
// ============================================================================
// Module: S3 Deployment State Backend
// Description: Object-key layout and config parsing for bucket storage.
// Purpose: Persist deployment state as JSON objects under a bucket prefix.
// Dependencies: rt-config, rt-core, serde_json, crate::{backend, error, object_store}
// ============================================================================

//! ## Overview
//! Records live under `<prefix>/<app>/`:
//!
//! - `APPLICATION.json`
//! - `SLOT-<slot>.json`
//! - `DEPLOYMENT-<slot>-<deployment>.json`
//!
//! Listings recover lookup keys by stripping the prefix and suffix from the
//! listed object keys. Config requires `bucket`; `key` (or `prefix`),
//! `region` and `profile` are optional strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use rt_config::BackendConfig;
use rt_core::AppName;
use rt_core::ApplicationData;
use rt_core::DeploymentData;
use rt_core::DeploymentId;
use rt_core::SlotData;
use rt_core::SlotId;
use rt_core::VersionedRecord;
use serde_json::Value;

use crate::backend::Backend;
use crate::backend::BackendKind;
use crate::error::BackendError;
use crate::object_store::JSON_CONTENT_TYPE;
use crate::object_store::MAX_RECORD_BYTES;
use crate::object_store::ObjectStore;
use crate::object_store::ObjectStoreConnector;
use crate::object_store::ObjectStoreError;
use crate::object_store::S3Location;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Object name of the application record.
const APPLICATION_OBJECT: &str = "APPLICATION.json";
/// Object name prefix of slot records.
const SLOT_OBJECT_PREFIX: &str = "SLOT-";
/// Object name prefix of deployment records.
const DEPLOYMENT_OBJECT_PREFIX: &str = "DEPLOYMENT-";
/// Suffix of every record object.
const JSON_SUFFIX: &str = ".json";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Parsed body of an S3 `deployment_state` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    /// Bucket location.
    pub location: S3Location,
    /// Key prefix without a trailing slash.
    pub prefix: String,
}

impl S3Config {
    /// Parses a block body.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Config`] when `bucket` is missing or a known
    /// field is not a string.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let bucket = optional_string(config, "bucket")?
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| BackendError::Config("Missing bucket field in config".to_string()))?;
        let raw_prefix = match optional_string(config, "key")? {
            Some(prefix) => prefix,
            None => optional_string(config, "prefix")?.unwrap_or_default(),
        };
        let prefix = raw_prefix.strip_suffix('/').unwrap_or(&raw_prefix).to_string();
        Ok(Self {
            location: S3Location {
                bucket,
                region: optional_string(config, "region")?,
                profile: optional_string(config, "profile")?,
            },
            prefix,
        })
    }
}

/// Reads an optional string field.
fn optional_string(config: &BackendConfig, field: &str) -> Result<Option<String>, BackendError> {
    match config.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(BackendError::Config(format!("Invalid {field} field in config: expected a string"))),
    }
}

// ============================================================================
// SECTION: Backend Kind
// ============================================================================

/// Kind building [`S3Backend`] values through an object store connector.
#[derive(Clone)]
pub struct S3BackendKind {
    /// Transport used to reach buckets.
    connector: Arc<dyn ObjectStoreConnector>,
}

impl S3BackendKind {
    /// Creates the kind over `connector`.
    #[must_use]
    pub fn new(connector: Arc<dyn ObjectStoreConnector>) -> Self {
        Self {
            connector,
        }
    }
}

impl BackendKind for S3BackendKind {
    fn initialize(&self, kind: &str, config: &BackendConfig) -> Result<Box<dyn Backend>, BackendError> {
        let config = S3Config::from_config(config)?;
        let store = self.connector.connect(&config.location)?;
        tracing::debug!(
            kind,
            bucket = %config.location.bucket,
            prefix = %config.prefix,
            "initialized s3 deployment state backend"
        );
        Ok(Box::new(S3Backend::new(kind, config, store)))
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Deployment state stored as bucket objects.
#[derive(Clone)]
pub struct S3Backend {
    /// Kind name this backend was configured under.
    kind: String,
    /// Bucket and key prefix.
    config: S3Config,
    /// Object store for the bucket.
    store: Arc<dyn ObjectStore>,
}

impl S3Backend {
    /// Wraps an object store with the record key layout.
    #[must_use]
    pub fn new(kind: impl Into<String>, config: S3Config, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            kind: kind.into(),
            config,
            store,
        }
    }

    /// Key prefix of everything owned by `app`, with a trailing slash.
    fn app_prefix(&self, app: &AppName) -> String {
        format!("{}{app}/", self.root())
    }

    /// Prefix of every application directory.
    fn root(&self) -> String {
        if self.config.prefix.is_empty() { String::new() } else { format!("{}/", self.config.prefix) }
    }

    /// Key of an application record.
    fn application_key(&self, app: &AppName) -> String {
        format!("{}{APPLICATION_OBJECT}", self.app_prefix(app))
    }

    /// Key prefix of an application's slot records.
    fn slot_prefix(&self, app: &AppName) -> String {
        format!("{}{SLOT_OBJECT_PREFIX}", self.app_prefix(app))
    }

    /// Key of a slot record.
    fn slot_key(&self, app: &AppName, slot: &SlotId) -> String {
        format!("{}{slot}{JSON_SUFFIX}", self.slot_prefix(app))
    }

    /// Key prefix of a slot's deployment records.
    fn deployment_prefix(&self, app: &AppName, slot: &SlotId) -> String {
        format!("{}{DEPLOYMENT_OBJECT_PREFIX}{slot}-", self.app_prefix(app))
    }

    /// Key of a deployment record.
    fn deployment_key(&self, app: &AppName, slot: &SlotId, deployment: &DeploymentId) -> String {
        format!("{}{deployment}{JSON_SUFFIX}", self.deployment_prefix(app, slot))
    }

    /// Reads and decodes a record, mapping a missing key through `missing`.
    fn read<R: VersionedRecord>(
        &self,
        key: &str,
        missing: impl FnOnce() -> BackendError,
    ) -> Result<R, BackendError> {
        let bytes = match self.store.get(key, MAX_RECORD_BYTES) {
            Ok(bytes) => bytes,
            Err(ObjectStoreError::NotFound(_)) => return Err(missing()),
            Err(err) => return Err(err.into()),
        };
        R::from_json(&bytes).map_err(|source| BackendError::Record {
            key: key.to_string(),
            source,
        })
    }

    /// Encodes and writes a record.
    fn write<R: VersionedRecord + Clone>(&self, key: &str, record: &R) -> Result<(), BackendError> {
        let bytes = record.clone().to_json().map_err(|source| BackendError::Record {
            key: key.to_string(),
            source,
        })?;
        self.store.put(key, bytes, Some(JSON_CONTENT_TYPE))?;
        Ok(())
    }
}

/// Returns the text between `prefix` and `.json`, if `key` has both.
fn strip_record_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)?.strip_suffix(JSON_SUFFIX)
}

impl Backend for S3Backend {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn is_ready(&self) -> Result<bool, BackendError> {
        match self.store.get(&self.config.prefix, MAX_RECORD_BYTES) {
            Ok(_) | Err(ObjectStoreError::NotFound(_)) => Ok(true),
            Err(err @ ObjectStoreError::AccessDenied(_)) => Err(BackendError::AccessDenied {
                bucket: self.config.location.bucket.clone(),
                prefix: self.config.prefix.clone(),
                message: err.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn list_applications(&self) -> Result<Vec<ApplicationData>, BackendError> {
        let root = self.root();
        let mut listed = Vec::new();
        for key in self.store.list(&root)? {
            let Some(app) = key
                .strip_prefix(root.as_str())
                .and_then(|rest| rest.strip_suffix(APPLICATION_OBJECT))
                .and_then(|rest| rest.strip_suffix('/'))
                .filter(|app| !app.is_empty() && !app.contains('/'))
            else {
                continue;
            };
            let app = AppName::new(app);
            let mut data: ApplicationData = self.read(&key, || BackendError::AppNotFound {
                app: app.to_string(),
            })?;
            data.name = app;
            listed.push(data);
        }
        Ok(listed)
    }

    fn get_application(&self, app: &AppName) -> Result<ApplicationData, BackendError> {
        let mut data: ApplicationData = self.read(&self.application_key(app), || BackendError::AppNotFound {
            app: app.to_string(),
        })?;
        data.name = app.clone();
        Ok(data)
    }

    fn save_application(&self, app: &AppName, data: &ApplicationData) -> Result<(), BackendError> {
        self.write(&self.application_key(app), data)
    }

    fn list_slots(&self, app: &AppName) -> Result<Vec<SlotData>, BackendError> {
        let prefix = self.slot_prefix(app);
        let mut listed = Vec::new();
        for key in self.store.list(&prefix)? {
            let Some(slot) = strip_record_key(&key, &prefix) else {
                continue;
            };
            let slot = SlotId::new(slot);
            let mut data: SlotData = self.read(&key, || BackendError::SlotNotFound {
                slot: slot.to_string(),
            })?;
            data.slot_id = slot;
            listed.push(data);
        }
        Ok(listed)
    }

    fn get_slot(&self, app: &AppName, slot: &SlotId) -> Result<SlotData, BackendError> {
        let mut data: SlotData = self.read(&self.slot_key(app, slot), || BackendError::SlotNotFound {
            slot: slot.to_string(),
        })?;
        data.slot_id = slot.clone();
        Ok(data)
    }

    fn save_slot(&self, app: &AppName, slot: &SlotId, data: &SlotData) -> Result<(), BackendError> {
        self.write(&self.slot_key(app, slot), data)
    }

    fn delete_slot(&self, app: &AppName, slot: &SlotId) -> Result<(), BackendError> {
        self.store.delete(&self.slot_key(app, slot))?;
        Ok(())
    }

    fn list_sorted_deployments(
        &self,
        app: &AppName,
        slot: &SlotId,
        limit: usize,
    ) -> Result<Vec<DeploymentData>, BackendError> {
        let prefix = self.deployment_prefix(app, slot);
        let mut listed = Vec::new();
        for key in self.store.list(&prefix)? {
            let Some(deployment) = strip_record_key(&key, &prefix) else {
                continue;
            };
            // `DEPLOYMENT-blue-` is also a prefix of slot `blue-2`'s keys.
            if !DeploymentId::is_well_formed(deployment) {
                tracing::debug!(key = %key, "skipping key outside the slot's deployments");
                continue;
            }
            let deployment = DeploymentId::new(deployment);
            let mut data: DeploymentData = self.read(&key, || BackendError::DeploymentNotFound {
                deployment: deployment.to_string(),
            })?;
            data.deployment_id = deployment;
            listed.push(data);
            if listed.len() == limit {
                break;
            }
        }
        Ok(listed)
    }

    fn get_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
    ) -> Result<DeploymentData, BackendError> {
        let key = self.deployment_key(app, slot, deployment);
        let mut data: DeploymentData = self.read(&key, || BackendError::DeploymentNotFound {
            deployment: deployment.to_string(),
        })?;
        data.deployment_id = deployment.clone();
        Ok(data)
    }

    fn save_deployment(
        &self,
        app: &AppName,
        slot: &SlotId,
        deployment: &DeploymentId,
        data: &DeploymentData,
    ) -> Result<(), BackendError> {
        self.write(&self.deployment_key(app, slot, deployment), data)
    }
}
