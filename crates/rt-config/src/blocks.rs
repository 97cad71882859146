// crates/rt-config/src/blocks.rs
// ============================================================================
// Module: RT Config Blocks
// Description: HCL decoding and per-kind block dispatch.
// Purpose: Turn rendered config text into typed blocks in document order.
// Dependencies: hcl-rs, serde_json
// ============================================================================

//! ## Overview
//! Decoding runs in three passes over the top-level body: every structure
//! must be a recognized block, each block name must stay within its
//! occurrence cap, and then each block is handed to its typed parser.
//! Attribute expressions are evaluated without variables; values that need
//! substitution come from the template stage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use hcl::Block;
use hcl::Body;
use hcl::Expression;
use hcl::Structure;
use hcl::Value;
use hcl::eval::Context;
use hcl::eval::Evaluate;

use crate::error::LoadErrorKind;
use crate::error::quote;
use crate::model::BLOCK_SCHEMAS;
use crate::model::BackendConfig;
use crate::model::ConfigBlock;
use crate::model::DEPLOYMENT_STATE_BLOCK;
use crate::model::DeploymentStateBlock;
use crate::model::REMOTE_STATE_BLOCK;
use crate::model::RemoteState;
use crate::model::block_schema;

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes rendered config text into typed blocks.
///
/// # Errors
///
/// Returns [`LoadErrorKind`] for invalid HCL, unknown blocks, exceeded
/// occurrence caps, or malformed block bodies.
pub fn decode_blocks(text: &str) -> Result<Vec<ConfigBlock>, LoadErrorKind> {
    let body = hcl::parse(text).map_err(|err| LoadErrorKind::Decode(err.to_string()))?;
    let blocks = top_level_blocks(body)?;
    check_occurrences(&blocks)?;
    blocks.into_iter().map(parse_block).collect()
}

/// Collects top-level blocks, rejecting attributes and unknown names.
fn top_level_blocks(body: Body) -> Result<Vec<Block>, LoadErrorKind> {
    let mut blocks = Vec::new();
    for structure in body {
        match structure {
            Structure::Attribute(attribute) => {
                return Err(LoadErrorKind::Malformed(format!(
                    "Unable to convert configuration of {}: top-level attributes are not supported",
                    quote(attribute.key.as_str())
                )));
            }
            Structure::Block(block) => {
                if block_schema(block.identifier.as_str()).is_none() {
                    return Err(LoadErrorKind::UnknownBlock {
                        name: block.identifier.as_str().to_string(),
                    });
                }
                blocks.push(block);
            }
        }
    }
    Ok(blocks)
}

/// Enforces per-name occurrence caps.
fn check_occurrences(blocks: &[Block]) -> Result<(), LoadErrorKind> {
    for schema in BLOCK_SCHEMAS {
        let found =
            blocks.iter().filter(|block| block.identifier.as_str() == schema.name).count();
        if found > schema.max_occurrences {
            return Err(LoadErrorKind::TooManyOccurrences {
                name: schema.name.to_string(),
                found,
                max: schema.max_occurrences,
            });
        }
    }
    Ok(())
}

/// Dispatches a block to its typed parser.
fn parse_block(block: Block) -> Result<ConfigBlock, LoadErrorKind> {
    tracing::debug!(block = block.identifier.as_str(), "parsing config block");
    match block.identifier.as_str() {
        DEPLOYMENT_STATE_BLOCK => parse_deployment_state(block).map(ConfigBlock::DeploymentState),
        REMOTE_STATE_BLOCK => parse_remote_state(block).map(ConfigBlock::RemoteState),
        other => Err(LoadErrorKind::UnknownBlock {
            name: other.to_string(),
        }),
    }
}

// ============================================================================
// SECTION: deployment_state
// ============================================================================

/// Parses `deployment_state "<kind>" { ... }`.
fn parse_deployment_state(block: Block) -> Result<DeploymentStateBlock, LoadErrorKind> {
    let kind = match block.labels.as_slice() {
        [label] => label.as_str().to_string(),
        labels => {
            return Err(LoadErrorKind::Malformed(format!(
                "{} requires exactly one label (the backend kind), {} given",
                quote(DEPLOYMENT_STATE_BLOCK),
                labels.len()
            )));
        }
    };
    let mut config = BackendConfig::new();
    for structure in block.body {
        match structure {
            Structure::Attribute(attribute) => {
                let value = evaluate(DEPLOYMENT_STATE_BLOCK, attribute.key.as_str(), &attribute.expr)?;
                let value = serde_json::to_value(&value).map_err(|err| {
                    LoadErrorKind::Malformed(format!(
                        "Unable to convert {} in {}: {err}",
                        quote(attribute.key.as_str()),
                        quote(DEPLOYMENT_STATE_BLOCK)
                    ))
                })?;
                config.insert(attribute.key.as_str().to_string(), value);
            }
            Structure::Block(nested) => {
                return Err(LoadErrorKind::Malformed(format!(
                    "Unexpected block {} in {} {}",
                    quote(nested.identifier.as_str()),
                    quote(DEPLOYMENT_STATE_BLOCK),
                    quote(&kind)
                )));
            }
        }
    }
    Ok(DeploymentStateBlock { kind, config })
}

// ============================================================================
// SECTION: remote_state
// ============================================================================

/// Parses `remote_state { backend = "..." config = { ... } }`.
fn parse_remote_state(block: Block) -> Result<RemoteState, LoadErrorKind> {
    if !block.labels.is_empty() {
        return Err(LoadErrorKind::Malformed(format!(
            "{} does not take labels",
            quote(REMOTE_STATE_BLOCK)
        )));
    }
    let mut backend = None;
    let mut config = None;
    for structure in block.body {
        match structure {
            Structure::Attribute(attribute) => match attribute.key.as_str() {
                "backend" => {
                    let value = evaluate(REMOTE_STATE_BLOCK, "backend", &attribute.expr)?;
                    backend = Some(expect_string("backend", value)?);
                }
                "config" => {
                    let value = evaluate(REMOTE_STATE_BLOCK, "config", &attribute.expr)?;
                    config = Some(string_map(value)?);
                }
                other => {
                    tracing::warn!(field = other, "ignoring unknown remote_state field");
                }
            },
            Structure::Block(nested)
                if nested.identifier.as_str() == "config" && nested.labels.is_empty() =>
            {
                config = Some(string_map_from_body(nested.body)?);
            }
            Structure::Block(nested) => {
                return Err(LoadErrorKind::Malformed(format!(
                    "Unexpected block {} in {}",
                    quote(nested.identifier.as_str()),
                    quote(REMOTE_STATE_BLOCK)
                )));
            }
        }
    }
    let backend = backend.ok_or_else(|| missing_field("backend"))?;
    let config = config.ok_or_else(|| missing_field("config"))?;
    Ok(RemoteState { backend, config })
}

/// Builds the missing-field error for `remote_state`.
fn missing_field(field: &str) -> LoadErrorKind {
    LoadErrorKind::MissingField {
        field: field.to_string(),
        block: REMOTE_STATE_BLOCK.to_string(),
    }
}

/// Converts an object value into a string map.
fn string_map(value: Value) -> Result<BTreeMap<String, String>, LoadErrorKind> {
    let Value::Object(entries) = value else {
        return Err(LoadErrorKind::Malformed(format!(
            "'config' in {} must be a map of strings",
            quote(REMOTE_STATE_BLOCK)
        )));
    };
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        let text = expect_string(&key, value)?;
        map.insert(key, text);
    }
    Ok(map)
}

/// Converts a nested `config { ... }` body into a string map.
fn string_map_from_body(body: Body) -> Result<BTreeMap<String, String>, LoadErrorKind> {
    let mut map = BTreeMap::new();
    for structure in body {
        let Structure::Attribute(attribute) = structure else {
            return Err(LoadErrorKind::Malformed(format!(
                "'config' in {} must be a map of strings",
                quote(REMOTE_STATE_BLOCK)
            )));
        };
        let key = attribute.key.as_str().to_string();
        let value = evaluate(REMOTE_STATE_BLOCK, &key, &attribute.expr)?;
        let text = expect_string(&key, value)?;
        map.insert(key, text);
    }
    Ok(map)
}

/// Requires a string value.
fn expect_string(key: &str, value: Value) -> Result<String, LoadErrorKind> {
    match value {
        Value::String(text) => Ok(text),
        _ => Err(LoadErrorKind::Malformed(format!(
            "{} in {} must be a string",
            quote(key),
            quote(REMOTE_STATE_BLOCK)
        ))),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Evaluates an attribute expression without variables.
fn evaluate(block: &str, key: &str, expr: &Expression) -> Result<Value, LoadErrorKind> {
    expr.evaluate(&Context::new()).map_err(|err| {
        LoadErrorKind::Malformed(format!(
            "Unable to evaluate {} in {}: {err}",
            quote(key),
            quote(block)
        ))
    })
}
