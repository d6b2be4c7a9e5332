// src/strategy/one_shot.rs

use tracing::debug;

use crate::errors::{Result, StayOpenError};
use crate::exec::{Command, CommandExecutor};
use crate::protocol::OutputHandler;

/// Spawns a fresh process for every call and never keeps one around.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShotStrategy;

impl OneShotStrategy {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        executor: &dyn CommandExecutor,
        tool_path: &str,
        arguments: &[String],
        handler: &mut (dyn OutputHandler + Send),
    ) -> Result<String> {
        let command = Command::new(tool_path, arguments.iter().cloned())?;
        let result = executor.execute_with(&command, handler).await?;

        if result.is_failure() {
            debug!(cmd = %command, exit_code = result.exit_status(), "one-shot command failed");
            return Err(StayOpenError::CommandFailed {
                status: result.exit_status(),
                output: result.into_output(),
            });
        }

        Ok(result.into_output())
    }
}
