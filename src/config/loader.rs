// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, StayOpenError};

/// Default config file name, looked up in the current working directory.
pub const DEFAULT_CONFIG_FILE: &str = "Stayopen.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        StayOpenError::ConfigError(format!("reading config file at {:?}: {}", path, e))
    })?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks the tool path, pool size and cleanup delay, and resolves the
///   execution strategy.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load `explicit` if given; otherwise load the default file when it exists
/// and fall back to built-in defaults when it does not.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_and_validate(path)
            } else {
                Ok(ConfigFile::default())
            }
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}
