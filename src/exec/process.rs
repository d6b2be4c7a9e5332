// src/exec/process.rs

//! Duplex handle to a running process.

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tracing::{debug, warn};

use crate::errors::{Result, StayOpenError};
use crate::protocol::{read_lines, CollectingHandler, MultiHandler, OutputHandler};

use super::executor::drain_stderr;

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How long `close` waits for a child to exit after its stdin was closed.
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Handle to a still-running process: write to its stdin, read its stdout.
///
/// The handle is either running (both streams open) or closed (both
/// released). Every read or write on a closed handle fails with
/// `ProcessClosed`. Dropping the handle kills a spawned child.
pub struct CommandProcess {
    label: String,
    child: Option<Child>,
    reader: Option<BoxedReader>,
    writer: Option<BoxedWriter>,
}

impl fmt::Debug for CommandProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandProcess")
            .field("label", &self.label)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl CommandProcess {
    /// Take ownership of a spawned child with piped stdin/stdout.
    ///
    /// stderr, when piped, is drained in the background and logged at debug.
    pub fn from_child(label: impl Into<String>, mut child: Child) -> Result<Self> {
        let label = label.into();

        let stdin = child.stdin.take().ok_or_else(|| {
            StayOpenError::InvalidArgument(format!("process '{label}' has no stdin pipe"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            StayOpenError::InvalidArgument(format!("process '{label}' has no stdout pipe"))
        })?;
        if let Some(stderr) = child.stderr.take() {
            drain_stderr(label.clone(), stderr);
        }

        let mut process = Self::from_streams(label, stdout, stdin);
        process.child = Some(child);
        Ok(process)
    }

    /// Wrap an arbitrary reader/writer pair, e.g. an in-memory duplex pipe.
    pub fn from_streams<R, W>(label: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            label: label.into(),
            child: None,
            reader: Some(BufReader::new(Box::new(reader))),
            writer: Some(Box::new(writer)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_running(&self) -> bool {
        self.reader.is_some() && self.writer.is_some()
    }

    pub fn is_closed(&self) -> bool {
        !self.is_running()
    }

    /// Write raw text to the process input.
    pub async fn write(&mut self, input: &str) -> Result<()> {
        let writer = self.writer()?;
        writer.write_all(input.as_bytes()).await?;
        Ok(())
    }

    /// Write each line followed by `\n`.
    pub async fn write_lines(&mut self, lines: &[String]) -> Result<()> {
        let writer = self.writer()?;
        for line in lines {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.writer()?.flush().await?;
        Ok(())
    }

    /// Read lines until `handler` asks to stop or the output ends.
    ///
    /// Returns every line read, joined with `\n`, including the line on which
    /// the handler stopped.
    pub async fn read(&mut self, handler: &mut (dyn OutputHandler + Send)) -> Result<String> {
        let label = self.label.clone();
        let reader = self
            .reader
            .as_mut()
            .ok_or(StayOpenError::ProcessClosed(label))?;

        let mut capture = CollectingHandler::new();
        {
            let mut multi =
                MultiHandler::new(vec![&mut capture as &mut (dyn OutputHandler + Send), handler]);
            read_lines(reader, &mut multi).await?;
        }
        Ok(capture.into_output())
    }

    /// Close both streams, then reap the child.
    ///
    /// Both streams are released even if closing stdin fails; the first error
    /// is returned. Closing a closed process is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        let mut first_err: Option<StayOpenError> = None;

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(process = %self.label, error = %e, "failed to close process stdin");
                first_err.get_or_insert(e.into());
            }
        }

        // Nothing can fail when releasing the read side.
        drop(self.reader.take());

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(process = %self.label, exit_code = ?status.code(), "process exited");
                }
                Ok(Err(e)) => {
                    first_err.get_or_insert(e.into());
                }
                Err(_) => {
                    warn!(process = %self.label, "process did not exit after close; killing it");
                    if let Err(e) = child.kill().await {
                        first_err.get_or_insert(e.into());
                    }
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn writer(&mut self) -> Result<&mut BoxedWriter> {
        self.writer
            .as_mut()
            .ok_or_else(|| StayOpenError::ProcessClosed(self.label.clone()))
    }
}
