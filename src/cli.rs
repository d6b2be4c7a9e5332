// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `stayopen`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stayopen",
    version,
    about = "Read and write file metadata through a persistent exiftool process.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Stayopen.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the exiftool executable (overrides config and `EXIFTOOL_PATH`).
    #[arg(long, value_name = "PATH")]
    pub exiftool: Option<String>,

    /// Keep one exiftool process open between requests.
    #[arg(long)]
    pub stay_open: bool,

    /// Number of exiftool processes to run requests on concurrently (at
    /// least 1).
    #[arg(
        long,
        value_name = "N",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub pool_size: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STAYOPEN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Print the detected exiftool version.
    Version,

    /// Print tags of one or more files.
    Read {
        /// Files to read.
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Tag to read; repeat for several. Defaults to every known tag.
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Print converted values instead of raw numbers.
        #[arg(long)]
        human: bool,
    },

    /// Write tags into a file.
    Write {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// `TAG=VALUE` pair; repeat for several.
        #[arg(long = "set", value_name = "TAG=VALUE", required = true)]
        values: Vec<String>,

        /// Do not keep a `_original` backup.
        #[arg(long)]
        overwrite_original: bool,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
