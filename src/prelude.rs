pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{PoolStats, Stage, Task, WorkerPool};
pub use crate::queue::{AlarmQueue, Message, MsgKind, QueueHandle};
pub use crate::{adjust, init, init_with_config, num_workers, submit};
