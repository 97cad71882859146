// crates/rt-core/src/lib.rs
// ============================================================================
// Module: RT Core Library
// Description: Public API surface for RT identifiers, validators and records.
// Purpose: Expose the typed building blocks shared by config, backends and CLI.
// Dependencies: crate::{identifiers, schema, timestamp, validators}
// ============================================================================

//! ## Overview
//! RT core holds the pieces every other crate agrees on: identifier
//! validators, opaque identifier types, the canonical timestamp, and the
//! schema-versioned application / slot / deployment records together with
//! their forward-migrating JSON codec. Nothing in this crate performs I/O.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod schema;
pub mod timestamp;
pub mod validators;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::AppName;
pub use identifiers::DEPLOYMENT_ID_LENGTH;
pub use identifiers::DeploymentId;
pub use identifiers::SlotId;
pub use schema::ApplicationData;
pub use schema::DeployPilot;
pub use schema::DeploymentData;
pub use schema::FinishedTerraformRun;
pub use schema::ResourceDiff;
pub use schema::SchemaError;
pub use schema::SlotCounterError;
pub use schema::SlotData;
pub use schema::TerraformRun;
pub use schema::VersionedRecord;
pub use timestamp::Timestamp;
pub use validators::ValidationError;

/// RT release version reported by the CLI and stamped into records.
pub const RT_VERSION: &str = env!("CARGO_PKG_VERSION");
