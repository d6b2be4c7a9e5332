// src/version/cache.rs

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::Version;
use crate::errors::{Result, StayOpenError};
use crate::exec::{Command, CommandExecutor};

/// Argument asking the tool to print its version and exit.
pub const VERSION_ARG: &str = "-ver";

static GLOBAL: LazyLock<VersionCache> = LazyLock::new(VersionCache::new);

/// Result of one version lookup, as handed to every caller waiting on it.
#[derive(Debug, Clone)]
enum Outcome {
    Found(Version),
    /// The tool ran but its answer was not a version.
    Unavailable,
    /// The tool could not be run at all.
    Failed(Arc<StayOpenError>),
}

#[derive(Debug)]
enum Entry {
    Ready(Version),
    Pending {
        id: u64,
        result: watch::Receiver<Option<Outcome>>,
    },
}

/// What a caller does after looking at the map.
enum Step {
    Wait(watch::Receiver<Option<Outcome>>),
    Lookup(u64, watch::Sender<Option<Outcome>>),
}

/// Memoizes the tool version per executable path.
///
/// At most one lookup runs per path. Callers arriving while it runs wait for
/// its outcome, success or failure, instead of spawning their own process.
/// Only a detected version is kept; failed lookups leave no entry behind and
/// are retried on the next `load`. If the caller running the lookup is
/// cancelled, one of the waiters starts a new one.
#[derive(Debug, Default)]
pub struct VersionCache {
    entries: Mutex<HashMap<String, Entry>>,
    next_id: AtomicU64,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache shared by every handle that does not bring its own.
    pub fn global() -> &'static VersionCache {
        &GLOBAL
    }

    /// Return the version of the tool at `path`, asking the tool if needed.
    ///
    /// - `Ok(Some(v))`: detected (and cached).
    /// - `Ok(None)`: the tool ran but exited non-zero or printed something
    ///   that is not a version. Nothing is cached.
    /// - `Err(_)`: the tool could not be run (e.g. `ProcessNotFound`).
    ///   Nothing is cached.
    pub async fn load(&self, path: &str, executor: &dyn CommandExecutor) -> Result<Option<Version>> {
        loop {
            let step = {
                let mut entries = self.lock();
                match entries.get(path) {
                    Some(Entry::Ready(version)) => return Ok(Some(*version)),
                    Some(Entry::Pending { result, .. }) => Step::Wait(result.clone()),
                    None => {
                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        let (tx, rx) = watch::channel(None);
                        entries.insert(path.to_string(), Entry::Pending { id, result: rx });
                        Step::Lookup(id, tx)
                    }
                }
            };

            match step {
                Step::Lookup(id, tx) => return self.run_lookup(path, id, tx, executor).await,
                Step::Wait(mut rx) => {
                    let outcome = rx.wait_for(Option::is_some).await.map(|v| v.clone());
                    match outcome {
                        Ok(Some(outcome)) => return replay(outcome),
                        // The caller running the lookup was cancelled; take over.
                        _ => debug!(tool = %path, "version lookup abandoned; retrying"),
                    }
                }
            }
        }
    }

    /// Number of cached versions.
    pub fn size(&self) -> usize {
        self.lock()
            .values()
            .filter(|entry| matches!(entry, Entry::Ready(_)))
            .count()
    }

    /// Whether a version lookup for `path` is currently running.
    pub fn is_pending(&self, path: &str) -> bool {
        matches!(self.lock().get(path), Some(Entry::Pending { .. }))
    }

    /// Forget every cached version so the next `load` asks the tool again.
    pub fn clear(&self) {
        let mut entries = self.lock();
        debug!(entries = entries.len(), "clearing version cache");
        entries.clear();
    }

    async fn run_lookup(
        &self,
        path: &str,
        id: u64,
        tx: watch::Sender<Option<Outcome>>,
        executor: &dyn CommandExecutor,
    ) -> Result<Option<Version>> {
        let mut guard = PendingGuard {
            cache: self,
            path,
            id,
            armed: true,
        };

        let result = query_version(path, executor).await;
        let shared = match &result {
            Ok(Some(version)) => Outcome::Found(*version),
            Ok(None) => Outcome::Unavailable,
            Err(err) => Outcome::Failed(Arc::new(duplicate(err))),
        };

        {
            let mut entries = self.lock();
            if owns_entry(&entries, path, id) {
                match &shared {
                    Outcome::Found(version) => {
                        entries.insert(path.to_string(), Entry::Ready(*version));
                    }
                    _ => {
                        entries.remove(path);
                    }
                }
            }
        }
        guard.armed = false;

        tx.send_replace(Some(shared));
        result
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drops the in-flight entry when the lookup future is cancelled, so the
/// next waiter can start over.
struct PendingGuard<'a> {
    cache: &'a VersionCache,
    path: &'a str,
    id: u64,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut entries = self.cache.lock();
        if owns_entry(&entries, self.path, self.id) {
            entries.remove(self.path);
        }
    }
}

/// `clear()` may have replaced the entry while the lookup ran.
fn owns_entry(entries: &HashMap<String, Entry>, path: &str, id: u64) -> bool {
    matches!(entries.get(path), Some(Entry::Pending { id: current, .. }) if *current == id)
}

fn replay(outcome: Outcome) -> Result<Option<Version>> {
    match outcome {
        Outcome::Found(version) => Ok(Some(version)),
        Outcome::Unavailable => Ok(None),
        Outcome::Failed(err) => Err(duplicate(&err)),
    }
}

/// Copy of a lookup error for another waiter; I/O sources keep their kind
/// and message.
fn duplicate(err: &StayOpenError) -> StayOpenError {
    match err {
        StayOpenError::ProcessNotFound { executable, source } => StayOpenError::ProcessNotFound {
            executable: executable.clone(),
            source: io::Error::new(source.kind(), source.to_string()),
        },
        StayOpenError::ProcessIo(e) => StayOpenError::ProcessIo(io::Error::new(e.kind(), e.to_string())),
        StayOpenError::InvalidArgument(msg) => StayOpenError::InvalidArgument(msg.clone()),
        other => StayOpenError::Other(anyhow::anyhow!(other.to_string())),
    }
}

async fn query_version(path: &str, executor: &dyn CommandExecutor) -> Result<Option<Version>> {
    let command = Command::new(path, [VERSION_ARG])?;

    debug!(tool = %path, "querying tool version");
    let result = executor.execute(&command).await?;

    if !result.is_success() {
        warn!(
            tool = %path,
            exit_code = result.exit_status(),
            "version query exited with failure"
        );
        return Ok(None);
    }

    match result.output().trim().parse::<Version>() {
        Ok(version) => {
            info!(tool = %path, %version, "detected tool version");
            Ok(Some(version))
        }
        Err(err) => {
            warn!(tool = %path, error = %err, "version query returned unusable output");
            Ok(None)
        }
    }
}
