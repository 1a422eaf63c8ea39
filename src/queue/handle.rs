use super::alarm_queue::{AlarmQueue, Message, MsgKind};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Shareable handle to an [`AlarmQueue`] that may not point at a queue yet.
///
/// Operations on an empty handle fail with [`Error::Uninitialized`]; sending
/// a missing payload fails with [`Error::NullMessage`]. Both are ordinary,
/// recoverable errors. Cloning the handle shares the queue.
#[derive(Debug)]
pub struct QueueHandle<T> {
    queue: Option<Arc<AlarmQueue<T>>>,
}

impl<T> QueueHandle<T> {
    /// A handle with no queue behind it.
    pub fn uninit() -> Self {
        Self { queue: None }
    }

    pub fn create() -> Self {
        Self {
            queue: Some(Arc::new(AlarmQueue::new())),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            queue: Some(Arc::new(AlarmQueue::with_capacity(capacity)?)),
        })
    }

    pub fn from_queue(queue: Arc<AlarmQueue<T>>) -> Self {
        Self { queue: Some(queue) }
    }

    pub fn is_initialized(&self) -> bool {
        self.queue.is_some()
    }

    fn queue(&self) -> Result<&AlarmQueue<T>> {
        self.queue.as_deref().ok_or(Error::Uninitialized)
    }

    pub fn send(&self, payload: Option<T>, kind: MsgKind) -> Result<()> {
        let queue = self.queue()?;
        let payload = payload.ok_or(Error::NullMessage)?;
        queue.send(payload, kind);
        Ok(())
    }

    pub fn recv(&self) -> Result<Message<T>> {
        Ok(self.queue()?.recv())
    }

    pub fn size(&self) -> Result<usize> {
        Ok(self.queue()?.len())
    }

    pub fn alarms(&self) -> Result<usize> {
        Ok(self.queue()?.alarms())
    }
}

impl<T> Clone for QueueHandle<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T> Default for QueueHandle<T> {
    fn default() -> Self {
        Self::uninit()
    }
}
