// src/strategy/pool.rs

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, warn};

use super::stay_open::StayOpenStrategy;
use crate::errors::{PoolShutdownError, Result, StayOpenError};
use crate::exec::CommandExecutor;
use crate::protocol::OutputHandler;

/// Fixed set of stay-open workers shared by concurrent callers.
///
/// A caller waits (FIFO) until a worker is idle, owns it for the duration of
/// one request and hands it back afterwards, whatever the outcome. Two
/// callers never hold the same worker.
#[derive(Debug)]
pub struct PoolStrategy {
    size: usize,
    permits: Semaphore,
    idle: Mutex<VecDeque<StayOpenStrategy>>,
}

/// A worker checked out of the pool; returned on drop.
struct Lease<'a> {
    pool: &'a PoolStrategy,
    worker: Option<StayOpenStrategy>,
    _permit: SemaphorePermit<'a>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        // Runs before `_permit` is released, so a woken waiter always finds
        // this worker back in the idle queue.
        if let Some(worker) = self.worker.take() {
            self.pool.lock_idle().push_back(worker);
        }
    }
}

impl PoolStrategy {
    pub fn new(size: usize, cleanup_delay: Duration) -> Result<Self> {
        if size == 0 {
            return Err(StayOpenError::InvalidArgument(
                "pool size must be at least 1".to_string(),
            ));
        }

        let idle = (0..size)
            .map(|_| StayOpenStrategy::new(cleanup_delay))
            .collect::<VecDeque<_>>();

        Ok(Self {
            size,
            permits: Semaphore::new(size),
            idle: Mutex::new(idle),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of workers not currently serving a request.
    pub fn available(&self) -> usize {
        self.lock_idle().len()
    }

    pub async fn execute(
        &self,
        executor: &dyn CommandExecutor,
        tool_path: &str,
        arguments: &[String],
        handler: &mut (dyn OutputHandler + Send),
    ) -> Result<String> {
        let lease = self.checkout().await?;
        let worker = lease.worker.as_ref().ok_or_else(|| {
            StayOpenError::ProcessInterrupted("pool lease lost its worker".to_string())
        })?;
        worker.execute(executor, tool_path, arguments, handler).await
    }

    /// True while at least one worker is serving a request.
    pub fn is_running(&self) -> bool {
        self.available() < self.size
    }

    /// Wait for in-flight requests, then close every worker.
    ///
    /// Each worker is closed exactly once even if others fail; all failures
    /// are reported together as `PoolShutdown`.
    pub async fn close(&self) -> Result<()> {
        let _all = self
            .permits
            .acquire_many(self.size as u32)
            .await
            .map_err(|_| StayOpenError::ProcessInterrupted("pool is shut down".to_string()))?;

        let workers: Vec<StayOpenStrategy> = self.lock_idle().drain(..).collect();
        let mut errors = Vec::new();
        for (idx, worker) in workers.iter().enumerate() {
            if let Err(e) = worker.close().await {
                warn!(worker = idx, error = %e, "failed to close pool worker");
                errors.push(e);
            }
        }
        self.lock_idle().extend(workers);

        if errors.is_empty() {
            debug!(size = self.size, "closed all pool workers");
            Ok(())
        } else {
            Err(PoolShutdownError::new(errors).into())
        }
    }

    async fn checkout(&self) -> Result<Lease<'_>> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StayOpenError::ProcessInterrupted("pool is shut down".to_string()))?;

        let worker = self.lock_idle().pop_front();
        if worker.is_none() {
            return Err(StayOpenError::ProcessInterrupted(
                "no idle pool worker despite a free slot".to_string(),
            ));
        }

        Ok(Lease {
            pool: self,
            worker,
            _permit: permit,
        })
    }

    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<StayOpenStrategy>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
