// crates/rt-core/src/schema/mod.rs
// ============================================================================
// Module: RT Versioned Record Codec
// Description: Schema-versioned JSON encoding with forward migrations.
// Purpose: Read records written by any older RT and refuse newer ones.
// Dependencies: serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Every record carries its schema version under the wire key `v`. Encoding
//! stamps the current version. Decoding probes `v` first and then walks a
//! small state machine: records at the current version are deserialized,
//! older records are passed through the kind's migration table one version
//! at a time, and newer or unmigratable records are rejected. Migrations work
//! on the intermediate JSON object and never rebuild the typed record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

pub mod migrations;
pub mod records;

pub use records::APPLICATION_SCHEMA_VERSION;
pub use records::ApplicationData;
pub use records::DEPLOYMENT_SCHEMA_VERSION;
pub use records::DeployPilot;
pub use records::DeploymentData;
pub use records::FinishedTerraformRun;
pub use records::ResourceDiff;
pub use records::SLOT_SCHEMA_VERSION;
pub use records::SlotCounterError;
pub use records::SlotData;
pub use records::TerraformRun;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire key carrying the schema version.
pub const SCHEMA_VERSION_KEY: &str = "v";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Record codec failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Input could not be parsed or did not match the record shape.
    #[error("Failed to decode {kind} data: {message}")]
    Decode {
        /// Record kind.
        kind: &'static str,
        /// Parser message.
        message: String,
    },
    /// Record could not be serialized.
    #[error("Failed to encode {kind} data: {message}")]
    Encode {
        /// Record kind.
        kind: &'static str,
        /// Serializer message.
        message: String,
    },
    /// Record was written by a newer RT.
    #[error("Failed to process {kind} data (schema v{version}). Please upgrade RT.")]
    NewerVersion {
        /// Record kind.
        kind: &'static str,
        /// Version found on the wire.
        version: u32,
    },
    /// No migration starts at the found version.
    #[error("No migrations available for {kind} schema v{version}")]
    MissingMigration {
        /// Record kind.
        kind: &'static str,
        /// Version found on the wire.
        version: u32,
    },
    /// A migration step rejected its input.
    #[error("{kind} schema migration from v{from} to v{to} failed: {message}")]
    Migration {
        /// Record kind.
        kind: &'static str,
        /// Source version.
        from: u32,
        /// Target version.
        to: u32,
        /// Failure detail.
        message: String,
    },
}

// ============================================================================
// SECTION: Migrations
// ============================================================================

/// Transform applied to the intermediate JSON object of one record.
pub type MigrationFn = fn(Map<String, Value>) -> Result<Map<String, Value>, String>;

/// One step in a record kind's migration table, raising `from` to `from + 1`.
#[derive(Clone, Copy)]
pub struct Migration {
    /// Version the step accepts.
    pub from: u32,
    /// Transform.
    pub apply: MigrationFn,
}

impl Migration {
    /// Version the step produces.
    #[must_use]
    pub const fn to(&self) -> u32 {
        self.from + 1
    }
}

/// Where a probed record sits relative to the current version.
#[derive(Clone, Copy)]
pub enum SchemaTransition {
    /// Record is at the current version.
    Current,
    /// Record is older and the given step applies next.
    Migrate(&'static Migration),
    /// Record is newer than this build understands.
    Newer(u32),
    /// Record is older and no step starts at its version.
    Unmigratable(u32),
}

impl SchemaTransition {
    /// Classifies `version` against `current` and the migration table.
    #[must_use]
    pub fn classify(version: u32, current: u32, migrations: &'static [Migration]) -> Self {
        if version == current {
            return Self::Current;
        }
        if version > current {
            return Self::Newer(version);
        }
        migrations
            .iter()
            .find(|migration| migration.from == version)
            .map_or(Self::Unmigratable(version), Self::Migrate)
    }
}

// ============================================================================
// SECTION: Versioned Records
// ============================================================================

/// A record kind with a schema version and a migration table.
pub trait VersionedRecord: Serialize + DeserializeOwned {
    /// Kind label used in messages.
    const KIND: &'static str;
    /// Version written by this build.
    const CURRENT_VERSION: u32;
    /// Append-only migration table.
    const MIGRATIONS: &'static [Migration];

    /// Overwrites the schema version field.
    fn set_schema_version(&mut self, version: u32);

    /// Stamps the current version and encodes the record.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Encode`] when serialization fails.
    fn to_json(&mut self) -> Result<Vec<u8>, SchemaError> {
        self.set_schema_version(Self::CURRENT_VERSION);
        serde_json::to_vec(&*self).map_err(|err| SchemaError::Encode {
            kind: Self::KIND,
            message: err.to_string(),
        })
    }

    /// Decodes a record, migrating it forward when it is older.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] for malformed input, newer versions, missing
    /// migrations, or a failed migration step.
    fn from_json(data: &[u8]) -> Result<Self, SchemaError> {
        decode(data)
    }
}

/// Probe that reads only the schema version.
#[derive(Deserialize)]
struct VersionProbe {
    /// Schema version; unversioned records are v0.
    #[serde(default)]
    v: u32,
}

/// Runs the decode state machine for record kind `R`.
///
/// # Errors
///
/// Returns [`SchemaError`] as described on [`VersionedRecord::from_json`].
pub fn decode<R: VersionedRecord>(data: &[u8]) -> Result<R, SchemaError> {
    let mut document: Value = serde_json::from_slice(data).map_err(decode_error::<R>)?;
    loop {
        let version = VersionProbe::deserialize(&document).map_err(decode_error::<R>)?.v;
        match SchemaTransition::classify(version, R::CURRENT_VERSION, R::MIGRATIONS) {
            SchemaTransition::Current => {
                return serde_json::from_value(document).map_err(decode_error::<R>);
            }
            SchemaTransition::Newer(version) => {
                return Err(SchemaError::NewerVersion {
                    kind: R::KIND,
                    version,
                });
            }
            SchemaTransition::Unmigratable(version) => {
                return Err(SchemaError::MissingMigration {
                    kind: R::KIND,
                    version,
                });
            }
            SchemaTransition::Migrate(migration) => {
                document = apply_migration::<R>(migration, document)?;
            }
        }
    }
}

/// Runs one migration step and checks it raised the version.
fn apply_migration<R: VersionedRecord>(
    migration: &Migration,
    document: Value,
) -> Result<Value, SchemaError> {
    let failure = |message: String| SchemaError::Migration {
        kind: R::KIND,
        from: migration.from,
        to: migration.to(),
        message,
    };
    let Value::Object(object) = document else {
        return Err(failure("record is not a JSON object".to_string()));
    };
    let migrated = (migration.apply)(object).map_err(failure)?;
    let raised = migrated.get(SCHEMA_VERSION_KEY).and_then(Value::as_u64);
    if raised != Some(u64::from(migration.to())) {
        return Err(failure("migration did not raise the schema version".to_string()));
    }
    tracing::debug!(
        kind = R::KIND,
        from = migration.from,
        to = migration.to(),
        "migrated record schema"
    );
    Ok(Value::Object(migrated))
}

/// Wraps a serde failure for record kind `R`.
fn decode_error<R: VersionedRecord>(err: serde_json::Error) -> SchemaError {
    SchemaError::Decode {
        kind: R::KIND,
        message: err.to_string(),
    }
}
