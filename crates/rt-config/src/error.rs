// crates/rt-config/src/error.rs
// ============================================================================
// Module: RT Config Errors
// Description: Load failures tagged with the pipeline stage that raised them.
// Purpose: Let callers tell template, decode and structure failures apart.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ConfigError`] pairs the config file path with a [`LoadErrorKind`].
//! Open failures render like the OS error; every other stage is prefixed
//! with the quoted path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::supported_block_names;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Config load failure for a specific file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.path, .kind))]
pub struct ConfigError {
    /// File the failure relates to.
    pub path: PathBuf,
    /// Stage and detail.
    #[source]
    pub kind: LoadErrorKind,
}

impl ConfigError {
    /// Creates a config error for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: LoadErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Load failure detail, one variant per pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadErrorKind {
    /// File could not be opened or read.
    #[error("{0}")]
    Io(String),
    /// Template rendering failed.
    #[error("Unable to render template: {0}")]
    Template(String),
    /// Rendered text is not valid HCL.
    #[error("Unable to decode HCL: {0}")]
    Decode(String),
    /// Top-level block name is not recognized.
    #[error(
        "Unrecognised config block ({}), supported: {}",
        quote(.name),
        quote_list(&supported_block_names())
    )]
    UnknownBlock {
        /// Offending block name.
        name: String,
    },
    /// Block occurs more often than allowed.
    #[error(
        "Found {found} occurences of {}. {} can only occur {max} x times in the config.",
        quote(.name),
        quote(.name)
    )]
    TooManyOccurrences {
        /// Block name.
        name: String,
        /// Occurrences found.
        found: usize,
        /// Occurrences allowed.
        max: usize,
    },
    /// Block or file content has the wrong shape.
    #[error("{0}")]
    Malformed(String),
    /// Required block field is absent.
    #[error("Missing '{field}' field in {}", quote(.block))]
    MissingField {
        /// Missing field name.
        field: String,
        /// Block the field belongs to.
        block: String,
    },
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Renders the top-level message. Open failures read like the OS error.
fn render(path: &Path, kind: &LoadErrorKind) -> String {
    match kind {
        LoadErrorKind::Io(message) => format!("open {}: {message}", path.display()),
        _ => format!("Failed to load config from {}: {kind}", quote(&path.display().to_string())),
    }
}

/// Double-quotes a string, escaping as needed.
pub(crate) fn quote(value: &str) -> String {
    format!("\"{}\"", value.escape_debug())
}

/// Renders names as a bracketed, space separated list of quoted strings.
pub(crate) fn quote_list(values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|value| quote(value)).collect();
    format!("[{}]", quoted.join(" "))
}
