// src/exec/command.rs

use std::fmt;
use std::process::Stdio;

use crate::errors::{Result, StayOpenError};

/// An executable plus its arguments.
///
/// Built once and never mutated. Neither the executable nor any argument may
/// be blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    executable: String,
    arguments: Vec<String>,
}

impl Command {
    pub fn new<I, S>(executable: impl Into<String>, arguments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandBuilder::new(executable).args(arguments).build()
    }

    pub fn builder(executable: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(executable)
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Arguments without the executable.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Full argv: the executable followed by the arguments in insertion order.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.executable.as_str())
            .chain(self.arguments.iter().map(String::as_str))
            .collect()
    }

    /// Build the tokio command with every stream piped and the child killed
    /// when its handle is dropped.
    pub(crate) fn to_process(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.executable);
        cmd.args(&self.arguments)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// Incremental builder for [`Command`]; validation happens in `build`.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    executable: String,
    arguments: Vec<String>,
}

impl CommandBuilder {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            arguments: Vec::new(),
        }
    }

    pub fn arg(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn args<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<Command> {
        if self.executable.trim().is_empty() {
            return Err(StayOpenError::InvalidArgument(
                "command executable must not be blank".to_string(),
            ));
        }

        if let Some(pos) = self.arguments.iter().position(|a| a.trim().is_empty()) {
            return Err(StayOpenError::InvalidArgument(format!(
                "argument #{} of '{}' must not be blank",
                pos, self.executable
            )));
        }

        Ok(Command {
            executable: self.executable,
            arguments: self.arguments,
        })
    }
}

/// Exit status and captured stdout of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    exit_status: i32,
    output: String,
}

impl CommandResult {
    pub fn new(exit_status: i32, output: impl Into<String>) -> Self {
        Self {
            exit_status,
            output: output.into(),
        }
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn into_output(self) -> String {
        self.output
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}
