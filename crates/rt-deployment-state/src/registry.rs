// crates/rt-deployment-state/src/registry.rs
// ============================================================================
// Module: Backend Kind Registry
// Description: Name-to-factory table for deployment state kinds.
// Purpose: Build configured backends from `deployment_state` blocks.
// Dependencies: rt-config, serde_json, crate::{backend, backends, error, object_store}
// ============================================================================

//! ## Overview
//! A registry is an explicit value passed to [`crate::DeploymentState::new`].
//! Built-in kinds are added with [`BackendKindRegistry::with_builtin_kinds`];
//! tests and embedders register their own kinds next to them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use rt_config::BackendConfig;
use rt_config::DeploymentStateBlock;
use serde_json::Value;

use crate::backend::Backend;
use crate::backend::BackendKind;
use crate::backends::MemoryBackendKind;
use crate::backends::S3BackendKind;
use crate::error::RegistryError;
use crate::object_store::ObjectStoreConnector;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Kind name of the in-memory backend.
pub const MEMORY_KIND: &str = "memory";
/// Kind name of the S3 backend.
pub const S3_KIND: &str = "s3";

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Table of backend kinds by name.
#[derive(Clone, Default)]
pub struct BackendKindRegistry {
    /// Factories by kind name.
    kinds: BTreeMap<String, Arc<dyn BackendKind>>,
}

impl BackendKindRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the `memory` and `s3` kinds.
    #[must_use]
    pub fn with_builtin_kinds(connector: Arc<dyn ObjectStoreConnector>) -> Self {
        let mut kinds: BTreeMap<String, Arc<dyn BackendKind>> = BTreeMap::new();
        kinds.insert(MEMORY_KIND.to_string(), Arc::new(MemoryBackendKind));
        kinds.insert(S3_KIND.to_string(), Arc::new(S3BackendKind::new(connector)));
        Self {
            kinds,
        }
    }

    /// Registers a kind under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::KindAlreadyRegistered`] when `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        kind: Arc<dyn BackendKind>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.kinds.contains_key(&name) {
            return Err(RegistryError::KindAlreadyRegistered {
                kind: name,
            });
        }
        self.kinds.insert(name, kind);
        Ok(())
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Returns registered kind names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }

    /// Builds one backend per block, in block order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when there are no blocks, a kind is unknown
    /// or repeated, or a factory rejects its config.
    pub fn build(&self, blocks: &[DeploymentStateBlock]) -> Result<Vec<Box<dyn Backend>>, RegistryError> {
        if blocks.is_empty() {
            return Err(RegistryError::NoConfiguration);
        }
        let mut seen = BTreeSet::new();
        let mut backends = Vec::with_capacity(blocks.len());
        for block in blocks {
            let Some(factory) = self.kinds.get(&block.kind) else {
                return Err(RegistryError::Unsupported {
                    kind: block.kind.clone(),
                });
            };
            if !seen.insert(block.kind.as_str()) {
                return Err(RegistryError::Duplicate {
                    kind: block.kind.clone(),
                });
            }
            let backend = factory.initialize(&block.kind, &block.config).map_err(|err| {
                RegistryError::Initialization {
                    message: format!(
                        "Unable to initalize backend with config: {}: {err}",
                        render_config(&block.config)
                    ),
                }
            })?;
            tracing::debug!(kind = %block.kind, "initialized deployment state backend");
            backends.push(backend);
        }
        Ok(backends)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Renders a block body as `map[...]` with quoted keys and string values.
fn render_config(config: &BackendConfig) -> String {
    let entries: Vec<String> = config
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => quote(text),
                other => other.to_string(),
            };
            format!("{}:{value}", quote(key))
        })
        .collect();
    format!("map[{}]", entries.join(" "))
}

/// Quotes a string with escapes applied.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.escape_debug())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::BackendConfig;
    use super::render_config;

    #[test]
    fn render_config_sorts_and_quotes() {
        let mut config = BackendConfig::new();
        config.insert("region".to_string(), Value::String("eu-west-1".to_string()));
        config.insert("bucket".to_string(), Value::String("state".to_string()));
        config.insert("retries".to_string(), Value::from(3));
        assert_eq!(render_config(&config), r#"map["bucket":"state" "region":"eu-west-1" "retries":3]"#);
    }

    #[test]
    fn render_empty_config() {
        assert_eq!(render_config(&BackendConfig::new()), "map[]");
    }
}
