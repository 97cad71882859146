// crates/rt-deployment-state/src/lib.rs
// ============================================================================
// Module: RT Deployment State Library
// Description: Pluggable storage for application, slot and deployment records.
// Purpose: Turn `deployment_state` blocks into backends and drive them.
// Dependencies: rt-config, rt-core, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! A host builds a [`BackendKindRegistry`], loads an
//! [`rt_config::RtConfig`] and passes its `deployment_state` blocks to
//! [`DeploymentState::new`]. Every block becomes one [`Backend`]; the
//! resulting [`DeploymentState`] reads from the first and writes to all.
//! Byte transport for the S3 kind is supplied through
//! [`ObjectStoreConnector`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod backends;
pub mod error;
pub mod object_store;
pub mod registry;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::Backend;
pub use backend::BackendKind;
pub use backends::MemoryBackend;
pub use backends::MemoryBackendKind;
pub use backends::S3Backend;
pub use backends::S3BackendKind;
pub use backends::S3Config;
pub use error::BackendError;
pub use error::RegistryError;
pub use error::StateError;
pub use object_store::InMemoryConnector;
pub use object_store::InMemoryObjectStore;
pub use object_store::ObjectStore;
pub use object_store::ObjectStoreConnector;
pub use object_store::ObjectStoreError;
pub use object_store::S3Location;
pub use registry::BackendKindRegistry;
pub use registry::MEMORY_KIND;
pub use registry::S3_KIND;
pub use state::DeploymentRequest;
pub use state::DeploymentState;
