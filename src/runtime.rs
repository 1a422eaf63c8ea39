//! The process-wide worker pool.

use crate::config::Config;
use crate::error::{fatal, Error, Result};
use crate::executor::{PoolStats, Task, WorkerPool};
use parking_lot::Mutex;

// Guards both initialization and submission bookkeeping.
static GLOBAL_POOL: Mutex<Option<WorkerPool>> = Mutex::new(None);

/// Start the global pool with `threads` workers.
///
/// Zero threads, or a pool that is already running, only produce a warning.
/// Failing to build the pool aborts the process.
pub fn init(threads: usize) {
    if threads == 0 {
        tracing::warn!("worker pool initialized with zero worker threads, ignoring");
        return;
    }

    let config = Config {
        num_threads: Some(threads),
        ..Config::default()
    };

    if let Err(e) = init_with_config(config) {
        fatal(e);
    }
}

/// Start the global pool from a full configuration.
///
/// Returns `Ok(())` without touching the running pool if one exists.
pub fn init_with_config(config: Config) -> Result<()> {
    let mut pool = GLOBAL_POOL.lock();

    if let Some(existing) = pool.as_ref() {
        tracing::warn!(
            current = existing.num_workers(),
            requested = config.worker_threads(),
            "worker pool already initialized, ignoring"
        );
        return Ok(());
    }

    *pool = Some(WorkerPool::new(&config)?);
    Ok(())
}

/// Hand `task` to the global pool.
///
/// Submitting before [`init`] is a usage error and aborts the process.
pub fn submit<A, R>(task: &Task<A, R>)
where
    A: Send + 'static,
    R: Send + 'static,
{
    let guard = GLOBAL_POOL.lock();
    if let Some(pool) = guard.as_ref() {
        pool.submit(task);
        return;
    }
    drop(guard);
    fatal(Error::usage("task submitted to uninitialized worker pool"));
}

/// Placeholder for runtime resizing; logs and leaves the pool unchanged.
pub fn adjust(threads: usize) {
    match GLOBAL_POOL.lock().as_ref() {
        Some(pool) => pool.adjust(threads),
        None => tracing::warn!(requested = threads, "adjust called on uninitialized worker pool"),
    }
}

/// Worker count of the global pool, `None` before a successful [`init`].
pub fn num_workers() -> Option<usize> {
    GLOBAL_POOL.lock().as_ref().map(WorkerPool::num_workers)
}

pub fn stats() -> Option<PoolStats> {
    GLOBAL_POOL.lock().as_ref().map(WorkerPool::stats)
}
