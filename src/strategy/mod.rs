// src/strategy/mod.rs

//! Execution strategies.
//!
//! A strategy decides how a request reaches the external tool:
//!
//! - [`one_shot`]: one process per call.
//! - [`stay_open`]: one persistent `-stay_open` daemon with idle cleanup.
//! - [`pool`]: a fixed number of stay-open daemons shared by concurrent
//!   callers.
//!
//! The set is closed, so [`ExecutionStrategy`] is an enum rather than a
//! trait object. Strategies are built from a [`StrategyKind`], which checks
//! the detected tool version first so unsupported modes fail before any
//! request is sent.

use std::time::Duration;

use crate::errors::Result;
use crate::exec::CommandExecutor;
use crate::protocol::OutputHandler;
use crate::version::{Feature, Version};

pub mod one_shot;
pub mod pool;
pub mod stay_open;

pub use one_shot::OneShotStrategy;
pub use pool::PoolStrategy;
pub use stay_open::{StayOpenStrategy, DEFAULT_CLEANUP_DELAY};

/// Which strategy to build, with its settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    OneShot,
    StayOpen { cleanup_delay: Duration },
    Pool { size: usize, cleanup_delay: Duration },
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::OneShot
    }
}

impl StrategyKind {
    /// Tool features this kind of strategy depends on.
    pub fn required_features(&self) -> &'static [Feature] {
        match self {
            StrategyKind::OneShot => &[],
            StrategyKind::StayOpen { .. } | StrategyKind::Pool { .. } => &[Feature::StayOpen],
        }
    }

    /// Build the strategy, failing with `UnsupportedCapability` when the
    /// detected version (or lack of one) cannot support it.
    pub fn build(self, detected: Option<&Version>) -> Result<ExecutionStrategy> {
        for feature in self.required_features() {
            feature.ensure_supported(detected)?;
        }

        Ok(match self {
            StrategyKind::OneShot => ExecutionStrategy::OneShot(OneShotStrategy::new()),
            StrategyKind::StayOpen { cleanup_delay } => {
                ExecutionStrategy::StayOpen(StayOpenStrategy::new(cleanup_delay))
            }
            StrategyKind::Pool {
                size,
                cleanup_delay,
            } => ExecutionStrategy::Pool(PoolStrategy::new(size, cleanup_delay)?),
        })
    }
}

#[derive(Debug)]
pub enum ExecutionStrategy {
    OneShot(OneShotStrategy),
    StayOpen(StayOpenStrategy),
    Pool(PoolStrategy),
}

impl ExecutionStrategy {
    /// Run `arguments` against the tool at `tool_path`.
    ///
    /// `handler` sees every response line; the raw response text is
    /// returned.
    pub async fn execute(
        &self,
        executor: &dyn CommandExecutor,
        tool_path: &str,
        arguments: &[String],
        handler: &mut (dyn OutputHandler + Send),
    ) -> Result<String> {
        match self {
            ExecutionStrategy::OneShot(s) => s.execute(executor, tool_path, arguments, handler).await,
            ExecutionStrategy::StayOpen(s) => s.execute(executor, tool_path, arguments, handler).await,
            ExecutionStrategy::Pool(s) => s.execute(executor, tool_path, arguments, handler).await,
        }
    }

    pub fn is_running(&self) -> bool {
        match self {
            ExecutionStrategy::OneShot(_) => false,
            ExecutionStrategy::StayOpen(s) => s.is_running(),
            ExecutionStrategy::Pool(s) => s.is_running(),
        }
    }

    /// Release every process held by the strategy. Safe to call repeatedly
    /// and on a strategy that never ran.
    pub async fn close(&self) -> Result<()> {
        match self {
            ExecutionStrategy::OneShot(_) => Ok(()),
            ExecutionStrategy::StayOpen(s) => s.close().await,
            ExecutionStrategy::Pool(s) => s.close().await,
        }
    }
}
