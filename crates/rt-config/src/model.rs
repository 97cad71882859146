// crates/rt-config/src/model.rs
// ============================================================================
// Module: RT Config Model
// Description: Typed configuration blocks and the block schema registry.
// Purpose: Replace the generic decoded map with one variant per block kind.
// Dependencies: serde_json
// ============================================================================

//! Typed config blocks and the table of recognized top-level block names.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Value;

// ============================================================================
// SECTION: Block Schema
// ============================================================================

/// Block name for deployment-state backends.
pub const DEPLOYMENT_STATE_BLOCK: &str = "deployment_state";
/// Block name for provisioner remote state.
pub const REMOTE_STATE_BLOCK: &str = "remote_state";

/// Recognized top-level block with its occurrence cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSchema {
    /// Block identifier.
    pub name: &'static str,
    /// Maximum occurrences per document.
    pub max_occurrences: usize,
}

/// Recognized blocks, sorted by name.
pub const BLOCK_SCHEMAS: &[BlockSchema] = &[
    BlockSchema {
        name: DEPLOYMENT_STATE_BLOCK,
        max_occurrences: usize::MAX,
    },
    BlockSchema {
        name: REMOTE_STATE_BLOCK,
        max_occurrences: 1,
    },
];

/// Looks up the schema for a block name.
#[must_use]
pub fn block_schema(name: &str) -> Option<&'static BlockSchema> {
    BLOCK_SCHEMAS.iter().find(|schema| schema.name == name)
}

/// Returns the recognized block names in sorted order.
#[must_use]
pub fn supported_block_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = BLOCK_SCHEMAS.iter().map(|schema| schema.name).collect();
    names.sort_unstable();
    names
}

// ============================================================================
// SECTION: Blocks
// ============================================================================

/// Backend-specific settings, opaque to the loader.
pub type BackendConfig = BTreeMap<String, Value>;

/// One `deployment_state "<kind>" { ... }` block.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentStateBlock {
    /// Backend kind named by the block label.
    pub kind: String,
    /// Block attributes.
    pub config: BackendConfig,
}

/// The `remote_state { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteState {
    /// Provisioner backend kind.
    pub backend: String,
    /// Provisioner backend settings.
    pub config: BTreeMap<String, String>,
}

/// A decoded top-level block.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigBlock {
    /// `deployment_state` block.
    DeploymentState(DeploymentStateBlock),
    /// `remote_state` block.
    RemoteState(RemoteState),
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Loaded RT configuration document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtConfig {
    /// Deployment-state backends in document order.
    pub deployment_state: Vec<DeploymentStateBlock>,
    /// Provisioner remote state, if configured.
    pub remote_state: Option<RemoteState>,
}

impl RtConfig {
    /// Builds a config from decoded blocks, preserving document order.
    #[must_use]
    pub fn from_blocks(blocks: Vec<ConfigBlock>) -> Self {
        let mut config = Self::default();
        for block in blocks {
            match block {
                ConfigBlock::DeploymentState(block) => config.deployment_state.push(block),
                ConfigBlock::RemoteState(remote) => config.remote_state = Some(remote),
            }
        }
        config
    }
}
