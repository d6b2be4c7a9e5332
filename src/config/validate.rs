// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{resolve_tool_path, ConfigFile, RawConfigFile, ToolSection};
use crate::errors::{Result, StayOpenError};
use crate::strategy::{StrategyKind, DEFAULT_CLEANUP_DELAY};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StayOpenError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_path(&raw.exiftool)?;
        let strategy = strategy_from_section(&raw.exiftool)?;
        let path = resolve_tool_path(raw.exiftool.path.as_deref());
        Ok(ConfigFile::new_unchecked(path, strategy, raw.read.format))
    }
}

fn validate_path(section: &ToolSection) -> Result<()> {
    if let Some(path) = &section.path {
        if path.trim().is_empty() {
            return Err(StayOpenError::ConfigError(
                "[exiftool].path must not be blank".to_string(),
            ));
        }
    }
    Ok(())
}

fn strategy_from_section(section: &ToolSection) -> Result<StrategyKind> {
    let cleanup_delay = cleanup_delay(section)?;

    match section.pool_size {
        Some(0) => Err(StayOpenError::ConfigError(
            "[exiftool].pool_size must be >= 1 (got 0)".to_string(),
        )),
        Some(size) if size > 1 => Ok(StrategyKind::Pool {
            size,
            cleanup_delay,
        }),
        Some(_) => Ok(StrategyKind::StayOpen { cleanup_delay }),
        None if section.stay_open => Ok(StrategyKind::StayOpen { cleanup_delay }),
        None => Ok(StrategyKind::OneShot),
    }
}

fn cleanup_delay(section: &ToolSection) -> Result<Duration> {
    let Some(raw) = section.cleanup_delay.as_deref() else {
        return Ok(DEFAULT_CLEANUP_DELAY);
    };

    let delay = parse_duration(raw).map_err(|e| {
        StayOpenError::ConfigError(format!("[exiftool].cleanup_delay {raw:?}: {e}"))
    })?;

    if delay.is_zero() {
        return Err(StayOpenError::ConfigError(
            "[exiftool].cleanup_delay must be greater than zero".to_string(),
        ));
    }
    Ok(delay)
}
