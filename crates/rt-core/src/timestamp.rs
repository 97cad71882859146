// crates/rt-core/src/timestamp.rs
// ============================================================================
// Module: RT Timestamps
// Description: RFC 3339 instants with a well-known zero value.
// Purpose: Keep record timestamps wire-compatible with existing state files.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! [`Timestamp`] wraps an offset-aware instant. The zero value is
//! `0001-01-01T00:00:00Z`, which is what unset instants look like in stored
//! records; JSON `null` decodes to the zero value as well.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::datetime;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Zero instant.
const ZERO: OffsetDateTime = datetime!(0001-01-01 0:00 UTC);

/// Record timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Returns the zero instant.
    #[must_use]
    pub const fn zero() -> Self {
        Self(ZERO)
    }

    /// Returns the current instant in UTC.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Wraps an existing instant.
    #[must_use]
    pub const fn from_datetime(value: OffsetDateTime) -> Self {
        Self(value)
    }

    /// Parses an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the text is not RFC 3339.
    pub fn parse(text: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(text, &Rfc3339).map(Self)
    }

    /// Returns true for the zero instant.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == ZERO
    }

    /// Returns the wrapped instant.
    #[must_use]
    pub const fn as_datetime(&self) -> OffsetDateTime {
        self.0
    }

    /// Formats the instant as RFC 3339.
    ///
    /// # Errors
    ///
    /// Returns the formatter error for instants RFC 3339 cannot express.
    pub fn to_rfc3339(&self) -> Result<String, time::error::Format> {
        self.0.format(&Rfc3339)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<OffsetDateTime> for Timestamp {
    fn from(value: OffsetDateTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_rfc3339().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.to_rfc3339().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Option::<String>::deserialize(deserializer)?;
        match text {
            None => Ok(Self::zero()),
            Some(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
