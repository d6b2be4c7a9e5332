// src/errors.rs

//! Crate-wide error type and result alias.

use std::fmt;

use thiserror::Error;

use crate::version::{Feature, Version};

#[derive(Error, Debug)]
pub enum StayOpenError {
    #[error("Process not found: cannot run '{executable}': {source}")]
    ProcessNotFound {
        executable: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process I/O error: {0}")]
    ProcessIo(#[from] std::io::Error),

    #[error("Process is closed: {0}")]
    ProcessClosed(String),

    #[error("Process output ended before the ready marker: {0}")]
    UnexpectedEof(String),

    #[error("Interrupted while waiting: {0}")]
    ProcessInterrupted(String),

    #[error("Command exited with status {status}: {output}")]
    CommandFailed { status: i32, output: String },

    #[error("{feature} requires version {required} or newer (detected: {})", display_detected(.detected))]
    UnsupportedCapability {
        feature: Feature,
        required: Version,
        detected: Option<Version>,
    },

    #[error(transparent)]
    PoolShutdown(#[from] PoolShutdownError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid version string: {0:?}")]
    InvalidVersion(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn display_detected(detected: &Option<Version>) -> String {
    match detected {
        Some(v) => v.to_string(),
        None => "unknown".to_string(),
    }
}

/// Every failure collected while closing the workers of a pool.
///
/// Closing a pool never stops at the first failing worker; the remaining
/// workers are still closed and all failures end up here.
#[derive(Debug)]
pub struct PoolShutdownError {
    errors: Vec<StayOpenError>,
}

impl PoolShutdownError {
    pub fn new(errors: Vec<StayOpenError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[StayOpenError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<StayOpenError> {
        self.errors
    }
}

impl fmt::Display for PoolShutdownError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to close {} pool worker(s)", self.errors.len())?;
        for (idx, err) in self.errors.iter().enumerate() {
            write!(f, "; [{idx}] {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PoolShutdownError {}

pub type Result<T> = std::result::Result<T, StayOpenError>;
