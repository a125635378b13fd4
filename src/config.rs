//! Configuration file loading
//!
//! Reads `invoice-roi.toml` from the working directory (or an explicit path).
//! Every key is optional; a missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::calculator::RoiConstants;

pub const DEFAULT_CONFIG_FILE: &str = "invoice-roi.toml";
pub const DEFAULT_DATABASE: &str = "invoice_roi.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: PathBuf,
    pub server: ServerConfig,
    pub engine: RoiConstants,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            server: ServerConfig::default(),
            engine: RoiConstants::default(),
        }
    }
}

/// Parse configuration from a TOML string
pub fn parse_config(contents: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str::<Config>(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration.
///
/// An explicit path must exist. The default path is optional and falls back
/// to built-in defaults when absent.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config at {}. Using defaults.", path.display());
            return Ok(Config::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let config = parse_config(&contents, &path)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}
