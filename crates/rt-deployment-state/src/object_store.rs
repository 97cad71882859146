// crates/rt-deployment-state/src/object_store.rs
// ============================================================================
// Module: Object Store Seam
// Description: Byte-level object storage used by the S3 backend.
// Purpose: Keep the key layout testable without a cloud SDK in the tree.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The S3 backend stores records as objects and needs exactly four calls:
//! put, get (with a size cap), delete and a lexicographic key listing. A
//! [`ObjectStoreConnector`] turns a bucket location into a store handle;
//! deployments plug the real transport in behind it. [`InMemoryConnector`]
//! hands out shared in-memory buckets and backs tests and dry runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a single stored record.
pub const MAX_RECORD_BYTES: usize = 16 * 1024 * 1024;

/// Content type set on every stored record.
pub const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Object store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectStoreError {
    /// No object exists under the key.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Credentials do not grant access.
    #[error("object store access denied: {0}")]
    AccessDenied(String),
    /// Invalid location or key input.
    #[error("object store invalid: {0}")]
    Invalid(String),
    /// Transport failure.
    #[error("object store io error: {0}")]
    Io(String),
    /// Store returned an error.
    #[error("object store backend error: {0}")]
    Backend(String),
    /// Object exceeds size limits.
    #[error("object too large: {path} ({actual_bytes} > {max_bytes})")]
    TooLarge {
        /// Object key.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual size in bytes.
        actual_bytes: usize,
    },
}

// ============================================================================
// SECTION: Store Traits
// ============================================================================

/// Minimal object store client for one bucket.
pub trait ObjectStore: Send + Sync {
    /// Writes a single object.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the write fails.
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<(), ObjectStoreError>;

    /// Reads a single object with a size limit.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NotFound`] for a missing key.
    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError>;

    /// Deletes a single object. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the delete fails.
    fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;

    /// Lists keys starting with `prefix` in lexicographic order.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the listing fails.
    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError>;
}

/// Bucket location taken from an S3 `deployment_state` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Location {
    /// Bucket name.
    pub bucket: String,
    /// Region override.
    pub region: Option<String>,
    /// Credentials profile override.
    pub profile: Option<String>,
}

/// Opens object stores for bucket locations.
pub trait ObjectStoreConnector: Send + Sync {
    /// Returns a store handle for `location`.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError`] when the location cannot be reached.
    fn connect(&self, location: &S3Location) -> Result<Arc<dyn ObjectStore>, ObjectStoreError>;
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Stored object with its content type.
#[derive(Debug, Clone)]
struct StoredObject {
    /// Object bytes.
    bytes: Vec<u8>,
    /// Content type given on write.
    content_type: Option<String>,
}

/// In-memory bucket. Clones share the same objects.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    /// Objects keyed by full key.
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
    /// When set, reads fail with [`ObjectStoreError::AccessDenied`].
    access_denied: Arc<AtomicBool>,
}

impl InMemoryObjectStore {
    /// Creates an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent reads fail as if credentials lacked access.
    pub fn set_access_denied(&self, denied: bool) {
        self.access_denied.store(denied, Ordering::SeqCst);
    }

    /// Returns every stored key in order.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Io`] when the bucket lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>, ObjectStoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    /// Returns the content type an object was written with.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::NotFound`] for a missing key.
    pub fn content_type(&self, key: &str) -> Result<Option<String>, ObjectStoreError> {
        self.lock()?
            .get(key)
            .map(|object| object.content_type.clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    /// Locks the object map.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>>, ObjectStoreError> {
        self.objects.lock().map_err(|_| ObjectStoreError::Io("object store lock poisoned".to_string()))
    }

    /// Fails when access has been revoked.
    fn check_access(&self, key: &str) -> Result<(), ObjectStoreError> {
        if self.access_denied.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::AccessDenied(key.to_string()));
        }
        Ok(())
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) -> Result<(), ObjectStoreError> {
        self.lock()?.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str, max_bytes: usize) -> Result<Vec<u8>, ObjectStoreError> {
        self.check_access(key)?;
        let bytes = self
            .lock()?
            .get(key)
            .map(|object| object.bytes.clone())
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))?;
        if bytes.len() > max_bytes {
            return Err(ObjectStoreError::TooLarge {
                path: key.to_string(),
                max_bytes,
                actual_bytes: bytes.len(),
            });
        }
        Ok(bytes)
    }

    fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, ObjectStoreError> {
        self.check_access(prefix)?;
        Ok(self.lock()?.keys().filter(|key| key.starts_with(prefix)).cloned().collect())
    }
}

// ============================================================================
// SECTION: In-Memory Connector
// ============================================================================

/// Connector handing out one shared [`InMemoryObjectStore`] per bucket.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    /// Buckets by name.
    buckets: Arc<Mutex<BTreeMap<String, InMemoryObjectStore>>>,
}

impl InMemoryConnector {
    /// Creates a connector with no buckets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bucket with `name`, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ObjectStoreError::Io`] when the bucket map lock is poisoned.
    pub fn bucket(&self, name: &str) -> Result<InMemoryObjectStore, ObjectStoreError> {
        let mut buckets = self
            .buckets
            .lock()
            .map_err(|_| ObjectStoreError::Io("bucket map lock poisoned".to_string()))?;
        Ok(buckets.entry(name.to_string()).or_default().clone())
    }
}

impl ObjectStoreConnector for InMemoryConnector {
    fn connect(&self, location: &S3Location) -> Result<Arc<dyn ObjectStore>, ObjectStoreError> {
        if location.bucket.is_empty() {
            return Err(ObjectStoreError::Invalid("bucket name is empty".to_string()));
        }
        Ok(Arc::new(self.bucket(&location.bucket)?))
    }
}
