// crates/rt-core/src/validators.rs
// ============================================================================
// Module: RT Input Validators
// Description: Rule checks for user-supplied identifier strings.
// Purpose: Reject malformed environment, application, slot and version names early.
// Dependencies: humantime, regex, thiserror
// ============================================================================

//! ## Overview
//! Each validator takes the parameter label it is checking (usually the CLI
//! flag name) and the candidate value, and returns either `Ok(())` or a
//! single [`ValidationError`] whose message embeds the label and the value.
//! Lengths are counted in characters and both endpoints are inclusive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum environment name length.
pub const MAX_ENVIRONMENT_NAME_LENGTH: usize = 4;
/// Maximum application name length.
pub const MAX_APPLICATION_NAME_LENGTH: usize = 26;
/// Maximum version length.
pub const MAX_VERSION_LENGTH: usize = 25;
/// Maximum slot id length.
pub const MAX_SLOT_ID_LENGTH: usize = 25;
/// Maximum namespace length.
pub const MAX_NAMESPACE_LENGTH: usize = 255;
/// Application name kept back for the shared infrastructure stack.
pub const RESERVED_APPLICATION_NAME: &str = "shared-services";

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Compiled pattern cache entry.
type Pattern = LazyLock<Result<Regex, regex::Error>>;

/// Environment names: alphanumerics and underscores.
static ENVIRONMENT_NAME_PATTERN: Pattern = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$"));
/// Application names: alphanumerics, underscores and dashes.
static APPLICATION_NAME_PATTERN: Pattern = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$"));
/// Versions: alphanumerics and underscores.
static VERSION_PATTERN: Pattern = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$"));
/// Slot ids: alphanumerics, dots, underscores and dashes.
static SLOT_ID_PATTERN: Pattern = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$"));
/// Namespaces: the S3-safe key character set.
static NAMESPACE_PATTERN: Pattern = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9/._\-*'()]+$"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation failure for a single parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value was empty where content is required.
    #[error("{name} must not be empty")]
    Empty {
        /// Parameter label.
        name: String,
    },
    /// Value length falls outside the allowed range.
    #[error("{name} (\"{value}\") must be between {min} and {max} characters long, {actual} given")]
    Length {
        /// Parameter label.
        name: String,
        /// Offending value.
        value: String,
        /// Minimum length (inclusive).
        min: usize,
        /// Maximum length (inclusive).
        max: usize,
        /// Actual length.
        actual: usize,
    },
    /// Value contains characters outside the allowed class.
    #[error("{name} (\"{value}\") must match {pattern}")]
    Pattern {
        /// Parameter label.
        name: String,
        /// Offending value.
        value: String,
        /// Expected pattern.
        pattern: String,
    },
    /// Value is reserved.
    #[error(
        "{name} (\"{value}\") is reserved for historical reasons (shared infrastructure) and cannot be used"
    )]
    Reserved {
        /// Parameter label.
        name: String,
        /// Offending value.
        value: String,
    },
    /// Path does not exist or cannot be inspected.
    #[error("{name} (\"{value}\") is not a valid path: {reason}")]
    Path {
        /// Parameter label.
        name: String,
        /// Offending value.
        value: String,
        /// Underlying stat failure.
        reason: String,
    },
    /// Number lies outside `0.0 ..= 1.0`.
    #[error("{name} ({value}) must be a percentage between 0.0 and 1.0")]
    Percentage {
        /// Parameter label.
        name: String,
        /// Offending value.
        value: f64,
    },
    /// Value is not a parseable duration.
    #[error("{name} (\"{value}\") is not a valid duration: {reason}")]
    Duration {
        /// Parameter label.
        name: String,
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// Built-in pattern failed to compile.
    #[error("{name} pattern is unavailable: {reason}")]
    PatternUnavailable {
        /// Parameter label.
        name: String,
        /// Compiler message.
        reason: String,
    },
}

// ============================================================================
// SECTION: Validators
// ============================================================================

/// Requires a non-empty string.
///
/// # Errors
///
/// Returns [`ValidationError::Empty`] for an empty value.
pub fn non_empty_string(name: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Requires a path that exists on the local filesystem.
///
/// # Errors
///
/// Returns [`ValidationError::Path`] when the path cannot be stat'ed.
pub fn valid_path(name: &str, value: &str) -> Result<(), ValidationError> {
    Path::new(value).metadata().map(|_| ()).map_err(|err| ValidationError::Path {
        name: name.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Requires a fraction in `0.0 ..= 1.0`.
///
/// # Errors
///
/// Returns [`ValidationError::Percentage`] for values outside the range or NaN.
pub fn percentage(name: &str, value: f64) -> Result<(), ValidationError> {
    if (0.0 ..= 1.0).contains(&value) {
        return Ok(());
    }
    Err(ValidationError::Percentage {
        name: name.to_string(),
        value,
    })
}

/// Validates an environment name (`dev`, `test`, `prod`, ...).
///
/// # Errors
///
/// Returns [`ValidationError`] when the length or character class is wrong.
pub fn environment_name(name: &str, value: &str) -> Result<(), ValidationError> {
    check_length(name, value, 1, MAX_ENVIRONMENT_NAME_LENGTH)?;
    check_pattern(name, value, &ENVIRONMENT_NAME_PATTERN)
}

/// Validates an application name.
///
/// # Errors
///
/// Returns [`ValidationError`] when the length or character class is wrong,
/// or the name is reserved.
pub fn application_name(name: &str, value: &str) -> Result<(), ValidationError> {
    check_length(name, value, 1, MAX_APPLICATION_NAME_LENGTH)?;
    check_pattern(name, value, &APPLICATION_NAME_PATTERN)?;
    if value == RESERVED_APPLICATION_NAME {
        return Err(ValidationError::Reserved {
            name: name.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validates an application version (usually a short git SHA).
///
/// # Errors
///
/// Returns [`ValidationError`] when the length or character class is wrong.
pub fn version(name: &str, value: &str) -> Result<(), ValidationError> {
    check_length(name, value, 1, MAX_VERSION_LENGTH)?;
    check_pattern(name, value, &VERSION_PATTERN)
}

/// Validates a slot id. Empty ids are accepted and mean "no slot".
///
/// # Errors
///
/// Returns [`ValidationError`] when the length or character class is wrong.
pub fn slot_id(name: &str, value: &str) -> Result<(), ValidationError> {
    let length = check_length(name, value, 0, MAX_SLOT_ID_LENGTH)?;
    if length > 1 {
        check_pattern(name, value, &SLOT_ID_PATTERN)?;
    }
    Ok(())
}

/// Validates a duration in `humantime` syntax.
///
/// Calendar units (`year`, `month`, `day`, singular or plural) are accepted
/// alongside clock units, with or without spaces between terms, e.g.
/// `1year2months3days4h` or `1h 30m`. Signed amounts (`-1h`, `+1h`) are
/// rejected, so a valid duration always points forward.
///
/// # Errors
///
/// Returns [`ValidationError`] for empty or unparseable values.
pub fn duration(name: &str, value: &str) -> Result<(), ValidationError> {
    non_empty_string(name, value)?;
    humantime::parse_duration(value).map(|_| ()).map_err(|err| ValidationError::Duration {
        name: name.to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    })
}

/// Validates a namespace (an object-key-safe path segment).
///
/// # Errors
///
/// Returns [`ValidationError`] when the length or character class is wrong.
pub fn namespace(name: &str, value: &str) -> Result<(), ValidationError> {
    check_length(name, value, 1, MAX_NAMESPACE_LENGTH)?;
    check_pattern(name, value, &NAMESPACE_PATTERN)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Checks the character length of `value`, returning it on success.
fn check_length(
    name: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<usize, ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::Length {
            name: name.to_string(),
            value: value.to_string(),
            min,
            max,
            actual,
        });
    }
    Ok(actual)
}

/// Checks `value` against a cached pattern.
fn check_pattern(name: &str, value: &str, pattern: &Pattern) -> Result<(), ValidationError> {
    let regex = pattern.as_ref().map_err(|err| ValidationError::PatternUnavailable {
        name: name.to_string(),
        reason: err.to_string(),
    })?;
    if regex.is_match(value) {
        return Ok(());
    }
    Err(ValidationError::Pattern {
        name: name.to_string(),
        value: value.to_string(),
        pattern: regex.as_str().to_string(),
    })
}
