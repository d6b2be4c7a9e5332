// src/config/model.rs

use serde::Deserialize;

use crate::strategy::StrategyKind;
use crate::types::ReadFormat;

/// Environment variable naming the tool executable when the config does not.
pub const PATH_ENV: &str = "EXIFTOOL_PATH";

/// Executable used when neither the config nor the environment names one.
pub const DEFAULT_TOOL_PATH: &str = "exiftool";

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [exiftool]
/// path = "/usr/local/bin/exiftool"
/// stay_open = true
/// pool_size = 2
/// cleanup_delay = "10m"
///
/// [read]
/// format = "numeric"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// How to find and run the tool, from `[exiftool]`.
    #[serde(default)]
    pub exiftool: ToolSection,

    /// Read defaults from `[read]`.
    #[serde(default)]
    pub read: ReadSection,
}

/// `[exiftool]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolSection {
    /// Path to the executable. Falls back to `EXIFTOOL_PATH`, then `exiftool`.
    #[serde(default)]
    pub path: Option<String>,

    /// Keep a `-stay_open` daemon around between calls.
    #[serde(default)]
    pub stay_open: bool,

    /// Number of daemons. Setting it implies `stay_open`; more than one
    /// selects the pool strategy.
    #[serde(default)]
    pub pool_size: Option<usize>,

    /// Idle delay before a daemon is shut down, e.g. `"30s"` or `"10m"`.
    #[serde(default)]
    pub cleanup_delay: Option<String>,
}

/// `[read]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadSection {
    #[serde(default)]
    pub format: ReadFormat,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (or `Default`), so
/// every value held here is known to be usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    path: String,
    strategy: StrategyKind,
    format: ReadFormat,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            path: resolve_tool_path(None),
            strategy: StrategyKind::OneShot,
            format: ReadFormat::default(),
        }
    }
}

impl ConfigFile {
    pub(crate) fn new_unchecked(path: String, strategy: StrategyKind, format: ReadFormat) -> Self {
        Self {
            path,
            strategy,
            format,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn format(&self) -> ReadFormat {
        self.format
    }
}

/// Explicit path first, then `EXIFTOOL_PATH`, then `exiftool`.
pub fn resolve_tool_path(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(PATH_ENV).ok().filter(|p| !p.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_TOOL_PATH.to_string())
}
