//! Task execution infrastructure.
//!
//! This module provides the task handle, the worker threads, and the fixed
//! size pool that connects workers to a shared alarm queue.

pub mod panic_handler;
pub mod pool;
pub mod task;
pub mod worker;

pub use panic_handler::PanicInfo;
pub use pool::{PoolStats, WorkerPool};
pub use task::{RunOutcome, Runnable, Stage, Task, TaskId};
