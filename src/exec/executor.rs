// src/exec/executor.rs

//! Pluggable command executor abstraction.
//!
//! Strategies and the version cache talk to a `CommandExecutor` instead of
//! spawning processes directly, so tests can swap in a fake that never
//! touches the OS.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::ChildStderr;
use tracing::{debug, info};

use super::command::{Command, CommandResult};
use super::process::CommandProcess;
use crate::errors::{Result, StayOpenError};
use crate::protocol::{read_lines, CollectingHandler, DrainHandler, MultiHandler, OutputHandler};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstracting how commands are run.
///
/// Production code uses [`RealCommandExecutor`]; tests provide their own
/// implementation.
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion, passing each stdout line to `handler`.
    ///
    /// Reading stops early once `handler` returns false.
    fn execute_with<'a>(
        &'a self,
        command: &'a Command,
        handler: &'a mut (dyn OutputHandler + Send),
    ) -> BoxFuture<'a, Result<CommandResult>>;

    /// Spawn `command` and hand back a live handle without waiting for it.
    fn start<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandProcess>>;

    /// Run `command` to completion, capturing all of its output.
    fn execute<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandResult>> {
        Box::pin(async move {
            let mut drain = DrainHandler;
            self.execute_with(command, &mut drain).await
        })
    }
}

/// Executor backed by real OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute_with<'a>(
        &'a self,
        command: &'a Command,
        handler: &'a mut (dyn OutputHandler + Send),
    ) -> BoxFuture<'a, Result<CommandResult>> {
        Box::pin(async move {
            debug!(cmd = %command, "running command");

            let mut cmd = command.to_process();
            cmd.stdin(Stdio::null());

            let mut child = cmd.spawn().map_err(|e| spawn_error(command, e))?;

            if let Some(stderr) = child.stderr.take() {
                drain_stderr(command.executable().to_string(), stderr);
            }

            let mut capture = CollectingHandler::new();
            if let Some(stdout) = child.stdout.take() {
                let mut reader = BufReader::new(stdout);
                let mut multi =
                    MultiHandler::new(vec![&mut capture as &mut (dyn OutputHandler + Send), handler]);
                read_lines(&mut reader, &mut multi).await?;
            }

            let status = child.wait().await?;
            let code = status.code().unwrap_or(-1);

            debug!(
                cmd = %command,
                exit_code = code,
                success = status.success(),
                "command exited"
            );

            Ok(CommandResult::new(code, capture.into_output()))
        })
    }

    fn start<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<CommandProcess>> {
        Box::pin(async move {
            let child = command
                .to_process()
                .spawn()
                .map_err(|e| spawn_error(command, e))?;

            info!(cmd = %command, pid = ?child.id(), "started process");
            CommandProcess::from_child(command.executable(), child)
        })
    }
}

/// A missing or non-executable binary is `ProcessNotFound`; anything else
/// that stops the spawn is plain I/O.
fn spawn_error(command: &Command, err: io::Error) -> StayOpenError {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => StayOpenError::ProcessNotFound {
            executable: command.executable().to_string(),
            source: err,
        },
        _ => StayOpenError::ProcessIo(err),
    }
}

/// Always consume stderr so the pipe never fills up; log at debug.
pub(crate) fn drain_stderr(label: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(process = %label, "stderr: {}", line);
        }
    });
}
