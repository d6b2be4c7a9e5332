// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod exiftool;
pub mod logging;
pub mod protocol;
pub mod strategy;
pub mod types;
pub mod version;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::cli::{CliArgs, CliCommand};
use crate::config::{load_or_default, ConfigFile};
use crate::exiftool::{ExifTool, ExifToolBuilder, Tag, WriteOptions};
use crate::strategy::{StrategyKind, DEFAULT_CLEANUP_DELAY};
use crate::types::ReadFormat;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - version detection and strategy selection
/// - the requested subcommand
/// - shutting the tool processes down again
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref()).context("loading configuration")?;
    let mut builder = apply_overrides(ExifToolBuilder::from_config(&cfg), &cfg, &args);
    if matches!(args.command, CliCommand::Read { human: true, .. }) {
        builder = builder.with_format(ReadFormat::HumanReadable);
    }

    let tool = builder.build().await.context("starting exiftool")?;
    let tool = Arc::new(tool);

    let outcome = run_command(&tool, args.command).await;

    if let Err(e) = tool.close().await {
        warn!(error = %e, "failed to stop exiftool cleanly");
    }
    outcome
}

/// Flags on the command line win over the config file.
fn apply_overrides(mut builder: ExifToolBuilder, cfg: &ConfigFile, args: &CliArgs) -> ExifToolBuilder {
    if let Some(path) = &args.exiftool {
        builder = builder.with_path(path.clone());
    }

    let cleanup_delay = match cfg.strategy() {
        StrategyKind::StayOpen { cleanup_delay } | StrategyKind::Pool { cleanup_delay, .. } => {
            cleanup_delay
        }
        StrategyKind::OneShot => DEFAULT_CLEANUP_DELAY,
    };

    match args.pool_size {
        // clap rejects 0.
        Some(1) => builder.enable_stay_open(cleanup_delay),
        Some(size) => builder.with_pool(size, cleanup_delay),
        None if args.stay_open => builder.enable_stay_open(cleanup_delay),
        None => builder,
    }
}

async fn run_command(tool: &Arc<ExifTool>, command: CliCommand) -> Result<()> {
    match command {
        CliCommand::Version => {
            match tool.version() {
                Some(version) => println!("{version}"),
                None => println!("unknown"),
            }
            Ok(())
        }
        CliCommand::Read { files, tags, .. } => {
            let tags = parse_tags(&tags)?;
            read_files(tool, files, tags).await
        }
        CliCommand::Write {
            file,
            values,
            overwrite_original,
        } => {
            let values = parse_assignments(&values)?;
            let options = WriteOptions { overwrite_original };
            tool.set_image_meta(&file, &values, options)
                .await
                .with_context(|| format!("writing tags to {:?}", file))?;
            println!("updated {}", file.display());
            Ok(())
        }
    }
}

/// Read every file concurrently; the strategy decides how many tool
/// processes actually serve them.
async fn read_files(tool: &Arc<ExifTool>, files: Vec<PathBuf>, tags: Vec<Tag>) -> Result<()> {
    debug!(files = files.len(), tags = tags.len(), "reading files");
    let tags = Arc::new(tags);
    let mut set = JoinSet::new();
    for (idx, file) in files.into_iter().enumerate() {
        let tool = Arc::clone(tool);
        let tags = Arc::clone(&tags);
        set.spawn(async move {
            let result = tool.get_image_meta(&file, &tags).await;
            (idx, file, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = set.join_next().await {
        results.push(joined.context("read task panicked")?);
    }
    results.sort_by_key(|(idx, _, _)| *idx);

    for (_, file, result) in results {
        let values = result.with_context(|| format!("reading tags from {:?}", file))?;
        println!("{}", file.display());
        for (tag, value) in values {
            println!("  {}: {}", tag, value);
        }
    }
    Ok(())
}

fn parse_tags(raw: &[String]) -> Result<Vec<Tag>> {
    if raw.is_empty() {
        return Ok(Tag::ALL.to_vec());
    }
    raw.iter()
        .map(|name| name.parse::<Tag>().map_err(anyhow::Error::from))
        .collect()
}

fn parse_assignments(raw: &[String]) -> Result<BTreeMap<Tag, String>> {
    let mut values = BTreeMap::new();
    for item in raw {
        let (name, value) = item
            .split_once('=')
            .with_context(|| format!("expected TAG=VALUE, got {:?}", item))?;
        values.insert(name.parse::<Tag>()?, value.to_string());
    }
    Ok(values)
}
