// crates/rt-deployment-state/src/error.rs
// ============================================================================
// Module: Deployment State Errors
// Description: Backend, registry and aggregate failure types.
// Purpose: Keep not-found conditions typed while preserving stable messages.
// Dependencies: rt-core, thiserror, crate::object_store
// ============================================================================

//! ## Overview
//! [`BackendError`] is raised by a single backend. [`RegistryError`] covers
//! building backends from config blocks. [`StateError`] wraps backend
//! failures with the operation that hit them while keeping the source
//! reachable, so callers can still tell a missing slot from a broken bucket.

// ============================================================================
// SECTION: Imports
// ============================================================================

use rt_core::SchemaError;
use rt_core::SlotCounterError;
use thiserror::Error;

use crate::object_store::ObjectStoreError;

// ============================================================================
// SECTION: Backend Errors
// ============================================================================

/// Failures raised by one backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Application has no stored record.
    #[error("Application \"{app}\" was not found.")]
    AppNotFound {
        /// Application name.
        app: String,
    },
    /// Slot has no stored record.
    #[error("Slot \"{slot}\" was not found.")]
    SlotNotFound {
        /// Slot identifier.
        slot: String,
    },
    /// Deployment has no stored record.
    #[error("Deployment \"{deployment}\" was not found.")]
    DeploymentNotFound {
        /// Deployment identifier.
        deployment: String,
    },
    /// Backend config block was rejected.
    #[error("{0}")]
    Config(String),
    /// Stored record could not be decoded or encoded.
    #[error("Failed to process record {key}: {source}")]
    Record {
        /// Storage key of the record.
        key: String,
        /// Codec failure.
        #[source]
        source: SchemaError,
    },
    /// Credentials cannot read the configured bucket.
    #[error("Failed accessing {bucket} (bucket): {prefix} (prefix). {message}")]
    AccessDenied {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: String,
        /// Store message.
        message: String,
    },
    /// Object store failure.
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    /// Local store failure.
    #[error("deployment state store error: {0}")]
    Store(String),
}

impl BackendError {
    /// Returns true for the typed not-found variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AppNotFound { .. } | Self::SlotNotFound { .. } | Self::DeploymentNotFound { .. }
        )
    }
}

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Failures raised while building backends from config blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No `deployment_state` blocks were given.
    #[error("No configuration provided")]
    NoConfiguration,
    /// Block names a kind nobody registered.
    #[error("Defined backend {kind} is not supported")]
    Unsupported {
        /// Backend kind.
        kind: String,
    },
    /// Two blocks name the same kind.
    #[error("Duplicate backend defined ({kind})")]
    Duplicate {
        /// Backend kind.
        kind: String,
    },
    /// Kind registered twice on one registry.
    #[error("Backend kind {kind} is already registered")]
    KindAlreadyRegistered {
        /// Backend kind.
        kind: String,
    },
    /// Backend factory rejected its config.
    #[error("Error initializing backend: \"{message}\"")]
    Initialization {
        /// Factory message including the rendered config.
        message: String,
    },
}

// ============================================================================
// SECTION: Aggregate Errors
// ============================================================================

/// Failures raised by [`crate::DeploymentState`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Aggregate has no backends.
    #[error("No backend found")]
    NoBackend,
    /// A backend operation failed.
    #[error("{context}: {source}")]
    Backend {
        /// Operation that failed.
        context: String,
        /// Backend failure.
        #[source]
        source: BackendError,
    },
    /// Slot counter bookkeeping failed.
    #[error(transparent)]
    SlotCounter(#[from] SlotCounterError),
    /// Deleting a slot failed on one or more backends.
    #[error("Failed to delete slot {slot} of \"{app}\": {}", .failures.join("; "))]
    DeleteSlot {
        /// Application name.
        app: String,
        /// Slot identifier.
        slot: String,
        /// One message per failed backend.
        failures: Vec<String>,
    },
}

impl StateError {
    /// Wraps a backend failure with the operation that hit it.
    pub(crate) fn backend(context: impl Into<String>, source: BackendError) -> Self {
        Self::Backend {
            context: context.into(),
            source,
        }
    }

    /// Returns the backend failure behind this error, if any.
    #[must_use]
    pub const fn backend_error(&self) -> Option<&BackendError> {
        match self {
            Self::Backend { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true when the underlying backend reported a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.backend_error().is_some_and(BackendError::is_not_found)
    }
}
