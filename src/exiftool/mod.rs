// src/exiftool/mod.rs

//! High-level metadata API.
//!
//! `ExifTool` validates inputs, turns tags into command-line arguments, runs
//! them through the configured [`ExecutionStrategy`] and parses the `-S`
//! output back into a map.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::errors::{Result, StayOpenError};
use crate::exec::{CommandExecutor, RealCommandExecutor};
use crate::protocol::{DrainHandler, TagHandler};
use crate::strategy::{ExecutionStrategy, StrategyKind};
use crate::types::ReadFormat;
use crate::version::{Version, VersionCache};

pub mod tag;

pub use tag::Tag;

/// Very short output: one `TagName: value` line per tag.
const SHORT_OUTPUT_ARG: &str = "-S";
const OVERWRITE_ORIGINAL_ARG: &str = "-overwrite_original";

/// Options for [`ExifTool::set_image_meta`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace the file in place instead of keeping a `_original` backup.
    pub overwrite_original: bool,
}

/// Handle to one external tool binary.
pub struct ExifTool {
    path: String,
    version: Option<Version>,
    format: ReadFormat,
    executor: Arc<dyn CommandExecutor>,
    strategy: ExecutionStrategy,
}

impl fmt::Debug for ExifTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExifTool")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("format", &self.format)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

impl ExifTool {
    pub fn builder() -> ExifToolBuilder {
        ExifToolBuilder::new()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Version detected when the handle was built, if the tool reported one.
    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    pub fn is_running(&self) -> bool {
        self.strategy.is_running()
    }

    /// Read `tags` from `file`.
    ///
    /// Tags the file does not carry are simply absent from the result.
    pub async fn get_image_meta(&self, file: &Path, tags: &[Tag]) -> Result<BTreeMap<Tag, String>> {
        let file = checked_file(file).await?;
        if tags.is_empty() {
            return Err(StayOpenError::InvalidArgument(
                "at least one tag must be requested".to_string(),
            ));
        }

        let mut arguments: Vec<String> = self
            .format
            .arguments()
            .iter()
            .map(|a| a.to_string())
            .collect();
        arguments.push(SHORT_OUTPUT_ARG.to_string());
        arguments.extend(tags.iter().map(|tag| format!("-{}", tag.name())));
        arguments.push(file.clone());

        let mut handler = TagHandler::new(tags.iter().map(|tag| tag.name()));
        self.strategy
            .execute(self.executor.as_ref(), &self.path, &arguments, &mut handler)
            .await?;

        let mut values = BTreeMap::new();
        for (name, value) in handler.into_values() {
            values.insert(name.parse::<Tag>()?, value);
        }
        debug!(file = %file, found = values.len(), requested = tags.len(), "read tags");
        Ok(values)
    }

    /// Write `values` into `file`.
    pub async fn set_image_meta(
        &self,
        file: &Path,
        values: &BTreeMap<Tag, String>,
        options: WriteOptions,
    ) -> Result<()> {
        let file = checked_file(file).await?;
        if values.is_empty() {
            return Err(StayOpenError::InvalidArgument(
                "at least one tag value must be given".to_string(),
            ));
        }

        let mut arguments = Vec::with_capacity(values.len() + 2);
        if options.overwrite_original {
            arguments.push(OVERWRITE_ORIGINAL_ARG.to_string());
        }
        arguments.extend(
            values
                .iter()
                .map(|(tag, value)| format!("-{}={}", tag.name(), value)),
        );
        arguments.push(file.clone());

        let mut handler = DrainHandler;
        let output = self
            .strategy
            .execute(self.executor.as_ref(), &self.path, &arguments, &mut handler)
            .await?;

        debug!(file = %file, response = %output.trim(), "wrote tags");
        Ok(())
    }

    /// Stop every process owned by this handle.
    pub async fn close(&self) -> Result<()> {
        self.strategy.close().await
    }
}

/// Builder for [`ExifTool`].
pub struct ExifToolBuilder {
    path: Option<String>,
    executor: Option<Arc<dyn CommandExecutor>>,
    cache: Option<Arc<VersionCache>>,
    strategy: StrategyKind,
    format: ReadFormat,
}

impl Default for ExifToolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExifToolBuilder {
    pub fn new() -> Self {
        Self {
            path: None,
            executor: None,
            cache: None,
            strategy: StrategyKind::OneShot,
            format: ReadFormat::default(),
        }
    }

    /// Start from a validated config file.
    pub fn from_config(config: &ConfigFile) -> Self {
        Self::new()
            .with_path(config.path())
            .with_strategy(config.strategy())
            .with_format(config.format())
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use an isolated version cache instead of the process-wide one.
    pub fn with_version_cache(mut self, cache: Arc<VersionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_format(mut self, format: ReadFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn enable_stay_open(self, cleanup_delay: Duration) -> Self {
        self.with_strategy(StrategyKind::StayOpen { cleanup_delay })
    }

    pub fn with_pool(self, size: usize, cleanup_delay: Duration) -> Self {
        self.with_strategy(StrategyKind::Pool {
            size,
            cleanup_delay,
        })
    }

    /// Detect the tool version and build the handle.
    ///
    /// Fails with `ProcessNotFound` when the tool cannot be run and with
    /// `UnsupportedCapability` when the requested strategy needs a newer
    /// tool; nothing is executed in either case beyond the version query.
    pub async fn build(self) -> Result<ExifTool> {
        let path = crate::config::model::resolve_tool_path(self.path.as_deref());
        let executor: Arc<dyn CommandExecutor> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(RealCommandExecutor::new()),
        };

        let version = match &self.cache {
            Some(cache) => cache.load(&path, executor.as_ref()).await?,
            None => VersionCache::global().load(&path, executor.as_ref()).await?,
        };

        let strategy = self.strategy.build(version.as_ref())?;
        info!(tool = %path, version = ?version, strategy = ?self.strategy, "exiftool handle ready");

        Ok(ExifTool {
            path,
            version,
            format: self.format,
            executor,
            strategy,
        })
    }
}

/// The file must exist and be a regular file; returns it as an argument.
async fn checked_file(file: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(file).await.map_err(|e| {
        StayOpenError::InvalidArgument(format!("cannot access {:?}: {}", file, e))
    })?;

    if !metadata.is_file() {
        return Err(StayOpenError::InvalidArgument(format!(
            "{:?} is not a regular file",
            file
        )));
    }

    file.to_str()
        .map(str::to_string)
        .ok_or_else(|| StayOpenError::InvalidArgument(format!("{:?} is not valid UTF-8", file)))
}
