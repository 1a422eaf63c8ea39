use super::task::{Job, Task};
use super::worker::{Worker, WorkerId, WorkerState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::queue::{AlarmQueue, MsgKind};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fixed set of worker threads draining one shared [`AlarmQueue`].
///
/// Workers run for the rest of the process; dropping the pool detaches
/// them. Tasks go in as normal messages and are executed by whichever
/// worker receives them first. If spawning fails part way through
/// [`WorkerPool::new`], the workers already started are retired and joined
/// before the error is returned.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    queue: Arc<AlarmQueue<Job>>,
    num_threads: usize,
    tasks_submitted: AtomicU64,
    // never set once the pool is built
    retired: Arc<AtomicBool>,
}

struct WorkerHandle {
    id: WorkerId,
    // kept so a shutdown or resize protocol can join workers later
    thread: JoinHandle<()>,
    state: Arc<WorkerState>,
}

/// Point-in-time counters for a pool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub num_workers: usize,
    pub queued: usize,
    pub alarms_queued: usize,
    pub tasks_submitted: u64,
    pub tasks_executed: u64,
    pub tasks_panicked: u64,
    pub tasks_skipped: u64,
    pub alarms_ignored: u64,
}

impl WorkerPool {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let queue = Arc::new(AlarmQueue::with_capacity(config.queue_capacity)?);
        let retired = Arc::new(AtomicBool::new(false));
        let mut workers = Vec::with_capacity(num_threads);

        for id in 0..num_threads {
            match spawn_worker(config, id, &queue, &retired) {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    tracing::warn!(
                        spawned = workers.len(),
                        requested = num_threads,
                        error = %e,
                        "worker spawn failed, retiring started workers"
                    );
                    retire_workers(workers, &queue, &retired);
                    return Err(e);
                }
            }
        }

        tracing::debug!(workers = num_threads, "worker pool started");

        Ok(Self {
            workers,
            queue,
            num_threads,
            tasks_submitted: AtomicU64::new(0),
            retired,
        })
    }

    /// Enqueue `task` for execution by a worker.
    pub fn submit<A, R>(&self, task: &Task<A, R>)
    where
        A: Send + 'static,
        R: Send + 'static,
    {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        self.queue.send(task.job(), MsgKind::Normal);
    }

    /// Put an alarm on the shared queue, blocking while another is pending.
    ///
    /// Workers receive alarms ahead of queued tasks but take no action on
    /// them yet.
    pub fn raise_alarm(&self) {
        let marker = Task::new((), |()| ());
        self.queue.send(marker.job(), MsgKind::Alarm);
    }

    /// Resizing is not supported; the worker count stays as configured.
    pub fn adjust(&self, threads: usize) {
        tracing::warn!(
            requested = threads,
            current = self.num_threads,
            "worker pool resizing is not supported, ignoring"
        );
    }

    pub fn num_workers(&self) -> usize {
        self.num_threads
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn worker_names(&self) -> Vec<String> {
        self.workers
            .iter()
            .map(|w| w.thread.thread().name().unwrap_or_default().to_string())
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            num_workers: self.num_threads,
            queued: self.queue.len(),
            alarms_queued: self.queue.alarms(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            ..PoolStats::default()
        };

        for worker in &self.workers {
            let state = &worker.state;
            stats.tasks_executed += state.tasks_executed.load(Ordering::Relaxed);
            stats.tasks_panicked += state.tasks_panicked.load(Ordering::Relaxed);
            stats.tasks_skipped += state.tasks_skipped.load(Ordering::Relaxed);
            stats.alarms_ignored += state.alarms_ignored.load(Ordering::Relaxed);
        }

        stats
    }
}

fn spawn_worker(
    config: &Config,
    id: WorkerId,
    queue: &Arc<AlarmQueue<Job>>,
    retired: &Arc<AtomicBool>,
) -> Result<WorkerHandle> {
    let worker = Worker::new(id);
    let state = worker.state.clone();
    let queue = queue.clone();
    let retired = retired.clone();
    let name = format!("{}-{}", config.thread_name_prefix, id);

    let mut builder = thread::Builder::new().name(name);

    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    let thread = builder
        .spawn(move || worker.run(queue, &retired))
        .map_err(|e| Error::executor(format!("spawn failed: {}", e)))?;

    Ok(WorkerHandle { id, thread, state })
}

/// Stop and join `workers`. Each one takes exactly one wake-up message
/// after seeing `retired`, so one marker is sent per worker.
fn retire_workers(workers: Vec<WorkerHandle>, queue: &AlarmQueue<Job>, retired: &AtomicBool) {
    retired.store(true, Ordering::Release);
    for _ in &workers {
        let marker = Task::new((), |()| ());
        queue.send(marker.job(), MsgKind::Normal);
    }
    for worker in workers {
        if worker.thread.join().is_err() {
            tracing::warn!(worker = worker.id, "worker panicked while retiring");
        }
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.num_threads)
            .field("workers", &self.workers.iter().map(|w| w.id).collect::<Vec<_>>())
            .field("queue", &self.queue)
            .field("retired", &self.retired.load(Ordering::Relaxed))
            .finish()
    }
}
