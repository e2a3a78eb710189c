//! Configuration loading from disk.
//!
//! The file format follows the extension: `.json` files go through
//! `serde_json`, everything else is TOML.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to encode default configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Load and validate configuration from a TOML or JSON file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = if is_json(path) {
        serde_json::from_str(&content)?
    } else {
        toml::from_str(&content)?
    };

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load the configuration, first writing the defaults to `path` if no file exists.
///
/// The flag is `true` when the file was created by this call.
pub fn load_or_init(path: &Path) -> Result<(ProxyConfig, bool), ConfigError> {
    let created = !path.exists();
    if created {
        let defaults = ProxyConfig::default();
        let content = if is_json(path) {
            serde_json::to_string_pretty(&defaults)?
        } else {
            toml::to_string_pretty(&defaults)?
        };
        fs::write(path, content)?;
    }
    Ok((load_config(path)?, created))
}
