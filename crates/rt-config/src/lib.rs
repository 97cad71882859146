// crates/rt-config/src/lib.rs
// ============================================================================
// Module: RT Config Library
// Description: Loader for the rt.hcl.tpl configuration document.
// Purpose: Expose the typed config model and its load pipeline.
// Dependencies: crate::{blocks, error, loader, model, template}
// ============================================================================

//! ## Overview
//! Loading is a fixed pipeline: resolve the file, render it as a template,
//! decode the result as HCL, then dispatch each top-level block to a typed
//! parser. Failures carry the file path and the stage that raised them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod blocks;
pub mod error;
pub mod loader;
pub mod model;
pub mod template;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ConfigError;
pub use error::LoadErrorKind;
pub use loader::CONFIG_FILENAME;
pub use loader::LEGACY_CONFIG_FILENAME;
pub use loader::MAX_CONFIG_FILE_SIZE;
pub use model::BLOCK_SCHEMAS;
pub use model::BackendConfig;
pub use model::BlockSchema;
pub use model::ConfigBlock;
pub use model::DeploymentStateBlock;
pub use model::RemoteState;
pub use model::RtConfig;
pub use template::TemplateVariables;
