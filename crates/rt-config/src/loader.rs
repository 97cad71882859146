// crates/rt-config/src/loader.rs
// ============================================================================
// Module: RT Config Loader
// Description: File discovery, read limits and the render/decode pipeline.
// Purpose: Load rt.hcl.tpl (or its legacy name) into an RtConfig.
// Dependencies: crate::{blocks, error, model, template}
// ============================================================================

//! ## Overview
//! A path that is a directory, or cannot be stat'ed, has the config file
//! name appended. `rt.hcl.tpl` is tried first, and `deployment-state.hcl.tpl`
//! once if that file does not exist. The file is then rendered, decoded and
//! dispatched into [`RtConfig`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use crate::blocks::decode_blocks;
use crate::error::ConfigError;
use crate::error::LoadErrorKind;
use crate::model::RtConfig;
use crate::template::TemplateVariables;
use crate::template::render;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Config file name looked up inside directories.
pub const CONFIG_FILENAME: &str = "rt.hcl.tpl";
/// Previous config file name, tried when the current one is absent.
pub const LEGACY_CONFIG_FILENAME: &str = "deployment-state.hcl.tpl";
/// Maximum config file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

// ============================================================================
// SECTION: Loading
// ============================================================================

impl RtConfig {
    /// Loads a config document from a file or directory.
    ///
    /// Returns the config together with the file it was read from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or any pipeline
    /// stage fails.
    pub fn load(
        environment: &str,
        account_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<(Self, PathBuf), ConfigError> {
        let (file_path, bytes) = read_config(path.as_ref())?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::new(
                file_path,
                LoadErrorKind::Malformed("config file exceeds size limit".to_string()),
            ));
        }
        let Ok(text) = std::str::from_utf8(&bytes) else {
            return Err(ConfigError::new(
                file_path,
                LoadErrorKind::Malformed("config file must be utf-8".to_string()),
            ));
        };
        let config = Self::parse(environment, account_id, text, &file_path)?;
        Ok((config, file_path))
    }

    /// Renders, decodes and dispatches in-memory config text.
    ///
    /// `path` labels errors only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when rendering, decoding or dispatch fails.
    pub fn parse(
        environment: &str,
        account_id: &str,
        text: &str,
        path: &Path,
    ) -> Result<Self, ConfigError> {
        let variables = TemplateVariables {
            environment,
            account_id,
        };
        let rendered = render(text, variables).map_err(|kind| ConfigError::new(path, kind))?;
        let blocks = decode_blocks(&rendered).map_err(|kind| ConfigError::new(path, kind))?;
        let config = Self::from_blocks(blocks);
        tracing::debug!(
            path = %path.display(),
            deployment_state = config.deployment_state.len(),
            remote_state = config.remote_state.is_some(),
            "loaded config"
        );
        Ok(config)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config file and reads it.
fn read_config(path: &Path) -> Result<(PathBuf, Vec<u8>), ConfigError> {
    let use_default_name = match fs::metadata(path) {
        Ok(metadata) => metadata.is_dir(),
        Err(_) => true,
    };
    let mut file_name = CONFIG_FILENAME;
    loop {
        let file_path = if use_default_name { path.join(file_name) } else { path.to_path_buf() };
        tracing::debug!(path = %file_path.display(), "trying to load config");
        match fs::read(&file_path) {
            Ok(bytes) => return Ok((file_path, bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound && file_name != LEGACY_CONFIG_FILENAME => {
                file_name = LEGACY_CONFIG_FILENAME;
            }
            Err(err) => {
                return Err(ConfigError::new(file_path, LoadErrorKind::Io(err.to_string())));
            }
        }
    }
}
