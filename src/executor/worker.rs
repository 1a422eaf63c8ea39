// worker thread loop
use super::task::{Job, RunOutcome};
use crate::queue::{AlarmQueue, MsgKind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

pub type WorkerId = usize;

// stats for each worker
#[derive(Debug)]
pub struct WorkerState {
    pub tasks_executed: AtomicU64,
    pub tasks_panicked: AtomicU64,
    pub tasks_skipped: AtomicU64,
    pub alarms_ignored: AtomicU64,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            tasks_skipped: AtomicU64::new(0),
            alarms_ignored: AtomicU64::new(0),
        }
    }
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            state: Arc::new(WorkerState::new()),
        }
    }

    // main loop; returns only once `retired` is set and a message wakes it
    pub fn run(&self, queue: Arc<AlarmQueue<Job>>, retired: &AtomicBool) {
        tracing::debug!(worker = self.id, "worker started");

        loop {
            let msg = queue.recv();
            if retired.load(Ordering::Acquire) {
                tracing::debug!(worker = self.id, "worker retired");
                return;
            }
            match msg.kind {
                MsgKind::Normal => self.execute(&msg.payload),
                MsgKind::Alarm => {
                    // alarms carry no work for now
                    tracing::debug!(worker = self.id, task = ?msg.payload.id(), "alarm received");
                    self.state.alarms_ignored.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn execute(&self, job: &Job) {
        let counter = match job.run() {
            RunOutcome::Completed => &self.state.tasks_executed,
            RunOutcome::Panicked => {
                self.state.tasks_executed.fetch_add(1, Ordering::Relaxed);
                &self.state.tasks_panicked
            }
            RunOutcome::Skipped => &self.state.tasks_skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Task;
    use std::thread;
    use std::time::{Duration, Instant};

    fn running() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn wait_for(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_worker_executes_normal_and_ignores_alarm() {
        let queue: Arc<AlarmQueue<Job>> = Arc::new(AlarmQueue::new());
        let worker = Worker::new(0);
        let state = worker.state.clone();

        {
            let queue = queue.clone();
            let retired = running();
            thread::spawn(move || worker.run(queue, &retired));
        }

        let ignored = Task::new(1u32, |x| x);
        let task = Task::new(20u32, |x| x + 1);
        queue.send(ignored.job(), MsgKind::Alarm);
        queue.send(task.job(), MsgKind::Normal);

        assert_eq!(task.join().unwrap(), 21);
        wait_for(|| state.tasks_executed.load(Ordering::Relaxed) == 1);
        assert_eq!(state.alarms_ignored.load(Ordering::Relaxed), 1);
        assert_eq!(ignored.stage(), crate::executor::Stage::Created);
    }

    #[test]
    fn test_worker_counts_panics_and_skips() {
        let queue: Arc<AlarmQueue<Job>> = Arc::new(AlarmQueue::new());
        let worker = Worker::new(1);
        let state = worker.state.clone();

        {
            let queue = queue.clone();
            let retired = running();
            thread::spawn(move || worker.run(queue, &retired));
        }

        let bad = Task::new((), |()| -> u8 { panic!("worker test panic") });
        let good = Task::new(3u8, |x| x);
        queue.send(bad.job(), MsgKind::Normal);
        queue.send(bad.job(), MsgKind::Normal);
        queue.send(good.job(), MsgKind::Normal);

        assert!(bad.take_result().is_err());
        assert_eq!(good.join().unwrap(), 3);
        bad.dismiss();

        wait_for(|| state.tasks_executed.load(Ordering::Relaxed) == 2);
        assert_eq!(state.tasks_skipped.load(Ordering::Relaxed), 1);
        assert_eq!(state.tasks_panicked.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_retired_worker_exits_without_running() {
        let queue: Arc<AlarmQueue<Job>> = Arc::new(AlarmQueue::new());
        let worker = Worker::new(2);
        let state = worker.state.clone();
        let retired = running();

        let handle = {
            let queue = queue.clone();
            let retired = retired.clone();
            thread::spawn(move || worker.run(queue, &retired))
        };

        let before = Task::new(5u8, |x| x * 2);
        queue.send(before.job(), MsgKind::Normal);
        assert_eq!(before.join().unwrap(), 10);

        retired.store(true, Ordering::Release);
        let after = Task::new(5u8, |x| x * 2);
        queue.send(after.job(), MsgKind::Normal);
        handle.join().unwrap();

        assert_eq!(after.stage(), crate::executor::Stage::Created);
        assert_eq!(state.tasks_executed.load(Ordering::Relaxed), 1);
        assert!(queue.is_empty());
    }
}
