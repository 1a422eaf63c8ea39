//! Blocking message queue with a single-slot alarm class.
//!
//! [`AlarmQueue`] is a FIFO guarded by one mutex and two condition variables.
//! Normal messages keep their arrival order; at most one alarm message may be
//! queued at a time and it is always delivered ahead of queued normal
//! messages. [`QueueHandle`] wraps a queue behind a nullable, shareable handle
//! and reports misuse as [`Error`](crate::Error) values.

pub mod alarm_queue;
pub mod handle;

pub use alarm_queue::{AlarmQueue, Message, MsgKind};
pub use handle::QueueHandle;
