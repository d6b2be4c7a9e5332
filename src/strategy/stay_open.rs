// src/strategy/stay_open.rs

//! Persistent daemon strategy.
//!
//! One tool process runs in `-stay_open` mode and serves every request sent
//! through this strategy. The process is started on the first call, closed
//! after `cleanup_delay` without activity, and transparently restarted by
//! the next call after any close.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, StayOpenError};
use crate::exec::{Command, CommandExecutor, CommandProcess};
use crate::protocol::{MultiHandler, OutputHandler, StopHandler, EXECUTE, SHUTDOWN, STAY_OPEN_ARGS};

/// Default delay after which an idle daemon is shut down.
pub const DEFAULT_CLEANUP_DELAY: Duration = Duration::from_secs(10 * 60);

#[derive(Debug)]
pub struct StayOpenStrategy {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cleanup_delay: Duration,
    /// Held for the whole request/response exchange, which serializes calls
    /// and keeps the idle timer from closing a process mid-call.
    process: AsyncMutex<Option<CommandProcess>>,
    /// Set while `execute` holds the lock, as opposed to `close` or cleanup.
    in_flight: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// Clears `in_flight` when the request ends, including by cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl StayOpenStrategy {
    pub fn new(cleanup_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cleanup_delay,
                process: AsyncMutex::new(None),
                in_flight: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn cleanup_delay(&self) -> Duration {
        self.inner.cleanup_delay
    }

    /// Send one request to the daemon and read its response up to `{ready}`.
    pub async fn execute(
        &self,
        executor: &dyn CommandExecutor,
        tool_path: &str,
        arguments: &[String],
        handler: &mut (dyn OutputHandler + Send),
    ) -> Result<String> {
        if let Some(arg) = arguments.iter().find(|a| a.contains(['\n', '\r'])) {
            return Err(StayOpenError::InvalidArgument(format!(
                "stay_open arguments must be single lines, got {arg:?}"
            )));
        }

        let mut slot = self.inner.process.lock().await;
        let _in_flight = InFlight::enter(&self.inner.in_flight);
        self.reset_cleanup_timer();

        // Checked out for the duration of the call: if this future is dropped
        // mid-request, the half-read process goes with it instead of being
        // handed to the next caller.
        let mut process = match slot.take().filter(CommandProcess::is_running) {
            Some(process) => process,
            None => {
                let command = Command::new(tool_path, STAY_OPEN_ARGS)?;
                info!(tool = %tool_path, "starting stay_open process");
                executor.start(&command).await?
            }
        };

        let outcome = send_request(&mut process, arguments, handler).await;
        // Idle time counts from the end of the last call, not its start.
        self.reset_cleanup_timer();

        match outcome {
            Ok(output) => {
                *slot = Some(process);
                Ok(output)
            }
            Err(err) => {
                warn!(tool = %tool_path, error = %err, "stay_open request failed; discarding process");
                if let Err(e) = process.close().await {
                    debug!(tool = %tool_path, error = %e, "closing broken process failed");
                }
                Err(err)
            }
        }
    }

    /// True when a daemon process is alive or a request is in flight.
    ///
    /// While `close` or idle cleanup is shutting the daemon down this
    /// already reports false.
    pub fn is_running(&self) -> bool {
        match self.inner.process.try_lock() {
            Ok(slot) => slot.as_ref().is_some_and(CommandProcess::is_running),
            Err(_) => self.inner.in_flight.load(Ordering::SeqCst),
        }
    }

    /// Cancel the idle timer and shut the daemon down.
    ///
    /// The process is forgotten even when shutting it down fails, so the
    /// strategy stays usable; the first failure is returned.
    pub async fn close(&self) -> Result<()> {
        self.inner.cancel_timer();
        let mut slot = self.inner.process.lock().await;
        match slot.take() {
            Some(mut process) => shutdown(&mut process).await,
            None => Ok(()),
        }
    }

    fn reset_cleanup_timer(&self) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.cleanup_delay;

        let mut timer = self.inner.lock_timer();
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.cleanup().await;
            }
        }));
    }
}

impl Inner {
    /// Idle timer body: close the daemon, logging instead of failing.
    async fn cleanup(&self) {
        let mut slot = self.process.lock().await;
        if let Some(mut process) = slot.take() {
            debug!(process = %process.label(), delay = ?self.cleanup_delay, "idle delay elapsed; closing stay_open process");
            if let Err(e) = shutdown(&mut process).await {
                warn!(process = %process.label(), error = %e, "idle cleanup failed to close process");
            }
        }
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

async fn send_request(
    process: &mut CommandProcess,
    arguments: &[String],
    handler: &mut (dyn OutputHandler + Send),
) -> Result<String> {
    process.write_lines(arguments).await?;
    process.write(EXECUTE).await?;
    process.write("\n").await?;
    process.flush().await?;

    let mut stop = StopHandler::new();
    let output = {
        let mut multi = MultiHandler::new(vec![&mut stop as &mut (dyn OutputHandler + Send), handler]);
        process.read(&mut multi).await?
    };

    if stop.ready_seen() {
        return Ok(output);
    }

    if !stop.at_end() {
        // The caller stopped early; skip the rest of this response so the
        // next request starts on a clean stream.
        let mut rest = StopHandler::new();
        process.read(&mut rest).await?;
        if rest.ready_seen() {
            return Ok(output);
        }
    }
    Err(StayOpenError::UnexpectedEof(process.label().to_string()))
}

/// Ask the daemon to exit, then close its streams.
///
/// Closing is attempted even when writing the shutdown request failed.
async fn shutdown(process: &mut CommandProcess) -> Result<()> {
    info!(process = %process.label(), "stopping stay_open process");

    let requested = async {
        process.write(SHUTDOWN).await?;
        process.flush().await
    }
    .await;
    let closed = process.close().await;

    requested.and(closed)
}
