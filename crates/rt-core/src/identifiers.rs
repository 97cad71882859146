// crates/rt-core/src/identifiers.rs
// ============================================================================
// Module: RT Identifiers
// Description: Opaque identifiers for applications, slots and deployments.
// Purpose: Give backend lookups strongly typed keys with stable string forms.
// Dependencies: serde, crate::{timestamp, validators}
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings. `new` wraps a value unchecked (for keys
//! read back from storage); `parse` runs the matching validator first and is
//! what user-facing entry points should call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::timestamp::Timestamp;
use crate::validators;
use crate::validators::ValidationError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Digits in a deployment identifier derived from a start time.
pub const DEPLOYMENT_ID_LENGTH: usize = 20;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Application name, the top-level key for deployment state.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    /// Creates an application name without validation.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Validates and wraps an application name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the name breaks the application name rules.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        validators::application_name("app", name)?;
        Ok(Self::new(name))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AppName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AppName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Slot identifier within an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    /// Creates a slot identifier without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Validates and wraps a slot identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the id breaks the slot id rules.
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        validators::slot_id("slot", id)?;
        Ok(Self::new(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SlotId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SlotId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Deployment identifier, unique within a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentId(String);

impl DeploymentId {
    /// Creates a deployment identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an identifier from a deployment start instant.
    ///
    /// The value is `i64::MAX` minus the unix seconds, zero-padded to
    /// [`DEPLOYMENT_ID_LENGTH`] digits, so later deployments sort first in a
    /// lexicographic listing.
    #[must_use]
    pub fn from_start_time(start_time: Timestamp) -> Self {
        let seconds = start_time.as_datetime().unix_timestamp();
        Self(format!("{:020}", i64::MAX.saturating_sub(seconds)))
    }

    /// Returns true when `text` has the shape produced by
    /// [`DeploymentId::from_start_time`].
    #[must_use]
    pub fn is_well_formed(text: &str) -> bool {
        text.len() == DEPLOYMENT_ID_LENGTH && text.bytes().all(|byte| byte.is_ascii_digit())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DeploymentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeploymentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
