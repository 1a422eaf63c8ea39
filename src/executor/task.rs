//! Deferred computations with a one-shot completion signal.

use super::panic_handler::catch_panic;
use crate::error::{fatal, Error, Result};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle stage of a task. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Created = 0,
    Executing = 1,
    Completed = 2,
    Dismissed = 3,
}

/// What a single `run` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Panicked,
    /// The task had already been started by someone else.
    Skipped,
}

/// Type-erased view of a task, as carried through the pool's queue.
pub trait Runnable: Send + Sync {
    fn id(&self) -> TaskId;

    fn run(&self) -> RunOutcome;
}

pub(crate) type Job = Arc<dyn Runnable>;

type Computation<A, R> = Box<dyn FnOnce(A) -> R + Send + 'static>;

struct TaskState<A, R> {
    stage: Stage,
    work: Option<(A, Computation<A, R>)>,
    result: Option<Result<R>>,
}

struct Inner<A, R> {
    id: TaskId,
    state: Mutex<TaskState<A, R>>,
    done: Condvar,
}

impl<A, R> Runnable for Inner<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    fn id(&self) -> TaskId {
        self.id
    }

    fn run(&self) -> RunOutcome {
        let (arg, func) = {
            let mut state = self.state.lock();
            if state.stage != Stage::Created {
                return RunOutcome::Skipped;
            }
            let Some(work) = state.work.take() else {
                return RunOutcome::Skipped;
            };
            state.stage = Stage::Executing;
            work
        };

        // user code runs without the lock held
        let (result, outcome) = match catch_panic(move || func(arg)) {
            Ok(value) => (Ok(value), RunOutcome::Completed),
            Err(info) => {
                tracing::error!(task = ?self.id, message = %info.message, "task panicked");
                (Err(Error::TaskFailed(info.message)), RunOutcome::Panicked)
            }
        };

        let mut state = self.state.lock();
        state.result = Some(result);
        state.stage = Stage::Completed;
        self.done.notify_all();

        outcome
    }
}

/// Handle to a computation `f(arg)` that is run once, on some thread, and
/// awaited by its owner.
///
/// Clones share the same task. The owner creates it, hands it to a pool
/// (or calls [`execute`](Self::execute) directly), [`wait`](Self::wait)s,
/// takes the result and finally [`dismiss`](Self::dismiss)es it.
pub struct Task<A, R> {
    inner: Arc<Inner<A, R>>,
}

impl<A, R> Task<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F>(arg: A, f: F) -> Self
    where
        F: FnOnce(A) -> R + Send + 'static,
    {
        Task {
            inner: Arc::new(Inner {
                id: TaskId::next(),
                state: Mutex::new(TaskState {
                    stage: Stage::Created,
                    work: Some((arg, Box::new(f))),
                    result: None,
                }),
                done: Condvar::new(),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn stage(&self) -> Stage {
        self.inner.state.lock().stage
    }

    pub fn is_completed(&self) -> bool {
        self.stage() >= Stage::Completed
    }

    /// Run the computation on the calling thread.
    ///
    /// Only the first call on a task does anything; later or concurrent
    /// calls return without running the computation again.
    pub fn execute(&self) -> RunOutcome {
        self.inner.run()
    }

    /// Block until the task has completed. The result is stable afterwards.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while state.stage < Stage::Completed {
            self.inner.done.wait(&mut state);
        }
    }

    /// Wait for completion and move the result out.
    ///
    /// Returns [`Error::TaskFailed`] if the computation panicked and a usage
    /// error if the result was already taken.
    pub fn take_result(&self) -> Result<R> {
        let mut state = self.inner.state.lock();
        while state.stage < Stage::Completed {
            self.inner.done.wait(&mut state);
        }
        state
            .result
            .take()
            .unwrap_or_else(|| Err(Error::usage("task result already taken")))
    }

    /// Release a completed task.
    ///
    /// Dismissing a task that has not completed aborts the process. Any
    /// result still held is dropped.
    pub fn dismiss(self) {
        let mut state = self.inner.state.lock();
        if state.stage != Stage::Completed {
            let stage = state.stage;
            drop(state);
            fatal(Error::usage(format!(
                "task {:?} dismissed in stage {:?}",
                self.inner.id, stage
            )));
        }
        state.stage = Stage::Dismissed;
        state.result = None;
    }

    /// Wait, take the result and dismiss in one step.
    pub fn join(self) -> Result<R> {
        let result = self.take_result();
        self.dismiss();
        result
    }

    pub(crate) fn job(&self) -> Job {
        self.inner.clone()
    }
}

impl<A, R> Clone for Task<A, R> {
    fn clone(&self) -> Self {
        Task {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, R> fmt::Debug for Task<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Task");
        dbg.field("id", &self.inner.id);
        if let Some(state) = self.inner.state.try_lock() {
            dbg.field("stage", &state.stage);
        }
        dbg.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_stage_ordering() {
        assert!(Stage::Created < Stage::Executing);
        assert!(Stage::Executing < Stage::Completed);
        assert!(Stage::Completed < Stage::Dismissed);
    }

    #[test]
    fn test_execute_inline() {
        let task = Task::new(6u64, |x| x * 7);
        assert_eq!(task.stage(), Stage::Created);

        assert_eq!(task.execute(), RunOutcome::Completed);
        assert_eq!(task.stage(), Stage::Completed);

        task.wait();
        assert_eq!(task.take_result().unwrap(), 42);
        task.dismiss();
    }

    #[test]
    fn test_execute_twice_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = {
            let calls = calls.clone();
            Task::new((), move |()| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert_eq!(task.execute(), RunOutcome::Completed);
        assert_eq!(task.execute(), RunOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        task.dismiss();
    }

    #[test]
    fn test_concurrent_execute_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let task = {
            let calls = calls.clone();
            Task::new(5u32, move |x| {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                x + 1
            })
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let task = task.clone();
                thread::spawn(move || task.execute())
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcomes.iter().filter(|o| **o == RunOutcome::Completed).count(),
            1
        );
        assert_eq!(task.join().unwrap(), 6);
    }

    #[test]
    fn test_wait_sees_result_stored_by_other_thread() {
        let task = Task::new(String::from("alarm"), |s| {
            thread::sleep(Duration::from_millis(50));
            s.to_uppercase()
        });

        let runner = {
            let task = task.clone();
            thread::spawn(move || task.execute())
        };

        task.wait();
        assert!(task.is_completed());
        assert_eq!(task.take_result().unwrap(), "ALARM");
        runner.join().unwrap();
        task.dismiss();
    }

    #[test]
    fn test_many_waiters_released() {
        let task = Task::new(1u8, |x| {
            thread::sleep(Duration::from_millis(30));
            x
        });

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let task = task.clone();
                thread::spawn(move || {
                    task.wait();
                    task.stage()
                })
            })
            .collect();

        task.execute();
        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), Stage::Completed);
        }
        task.dismiss();
    }

    #[test]
    fn test_panicking_computation_completes_with_error() {
        let task = Task::new(0u32, |_| -> u32 { panic!("divide by zero") });

        assert_eq!(task.execute(), RunOutcome::Panicked);
        assert!(task.is_completed());

        match task.take_result() {
            Err(Error::TaskFailed(msg)) => assert_eq!(msg, "divide by zero"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        task.dismiss();
    }

    #[test]
    fn test_result_taken_twice() {
        let task = Task::new(1i32, |x| x);
        task.execute();
        assert_eq!(task.take_result().unwrap(), 1);
        assert!(matches!(task.take_result(), Err(Error::UsageViolation(_))));
        task.dismiss();
    }

    #[test]
    fn test_dismissed_clone_is_inert() {
        let task = Task::new(2i32, |x| x * 2);
        let other = task.clone();
        task.execute();
        task.dismiss();

        assert_eq!(other.stage(), Stage::Dismissed);
        assert_eq!(other.execute(), RunOutcome::Skipped);
        other.wait();
    }

    #[test]
    fn test_task_ids_unique() {
        let a = Task::new((), |()| ());
        let b = Task::new((), |()| ());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.job().id(), a.id());
    }
}
