//! alarm-pool - a fixed-size worker pool over a blocking alarm queue
//!
//! Three small concurrency primitives that compose into a thread pool:
//!
//! - [`AlarmQueue`]: a blocking FIFO with a single-slot, high-priority alarm
//!   class.
//! - [`Task`]: a deferred computation with a one-shot completion signal.
//! - [`WorkerPool`]: worker threads draining a shared queue and executing
//!   the tasks they receive.
//!
//! # Quick Start
//!
//! ```no_run
//! use alarm_pool::prelude::*;
//!
//! alarm_pool::init(4);
//!
//! let tasks: Vec<_> = (0u64..100)
//!     .map(|i| {
//!         let task = Task::new(i, |x| x * x);
//!         alarm_pool::submit(&task);
//!         task
//!     })
//!     .collect();
//!
//! for task in tasks {
//!     task.wait();
//!     let square = task.take_result().unwrap();
//!     println!("{}", square);
//!     task.dismiss();
//! }
//! ```
//!
//! # Usage errors
//!
//! Queue misuse through a [`QueueHandle`] is reported as an [`Error`].
//! Breaking the task or pool contract (dismissing an unfinished task,
//! submitting before [`init`]) logs a diagnostic and aborts the process.

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod queue;
pub mod runtime;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use executor::{PoolStats, Stage, Task, WorkerPool};
pub use queue::{AlarmQueue, Message, MsgKind, QueueHandle};
pub use runtime::{adjust, init, init_with_config, num_workers, stats, submit};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pool_squares() {
        let config = Config::builder().num_threads(4).build().unwrap();
        let pool = WorkerPool::new(&config).unwrap();

        let tasks: Vec<_> = (0u64..100)
            .map(|i| {
                let task = Task::new(i, |x| x * x);
                pool.submit(&task);
                task
            })
            .collect();

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            task.wait();
            results.push(task.take_result().unwrap());
            task.dismiss();
        }

        results.sort_unstable();
        assert_eq!(results, (0u64..100).map(|i| i * i).collect::<Vec<_>>());
    }

    #[test]
    fn test_queue_many_producers_many_consumers() {
        const PRODUCERS: u32 = 4;
        const PER_PRODUCER: u32 = 250;

        let queue = Arc::new(AlarmQueue::new());

        let consumers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || {
                    (0..PER_PRODUCER)
                        .map(|_| queue.recv().into_payload())
                        .collect::<Vec<u32>>()
                })
            })
            .collect();

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.send(p * PER_PRODUCER + i, MsgKind::Normal);
                    }
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }

        let mut seen = HashSet::new();
        for consumer in consumers {
            for value in consumer.join().unwrap() {
                assert!(seen.insert(value), "duplicate {}", value);
            }
        }

        assert_eq!(seen.len(), (PRODUCERS * PER_PRODUCER) as usize);
        assert!(queue.is_empty());
    }
}
