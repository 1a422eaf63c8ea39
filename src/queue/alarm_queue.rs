use crate::error::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;

/// Delivery class of a queued message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgKind {
    Normal,
    Alarm,
}

impl Default for MsgKind {
    fn default() -> Self {
        MsgKind::Normal
    }
}

/// A payload together with its delivery class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message<T> {
    pub kind: MsgKind,
    pub payload: T,
}

impl<T> Message<T> {
    pub fn new(payload: T, kind: MsgKind) -> Self {
        Self { kind, payload }
    }

    pub fn is_alarm(&self) -> bool {
        self.kind == MsgKind::Alarm
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

struct State<T> {
    messages: VecDeque<Message<T>>,
    alarms: usize,
}

impl<T> State<T> {
    // Alarm first, wherever it sits; otherwise the head.
    fn pop_next(&mut self) -> Option<Message<T>> {
        if self.alarms > 0 {
            let pos = self.messages.iter().position(Message::is_alarm);
            if let Some(msg) = pos.and_then(|idx| self.messages.remove(idx)) {
                self.alarms -= 1;
                return Some(msg);
            }
        }
        self.messages.pop_front()
    }
}

/// Blocking FIFO queue with at most one outstanding alarm message.
///
/// - [`send`](Self::send) of an alarm blocks while another alarm is queued.
/// - [`recv`](Self::recv) blocks while the queue is empty and hands out the
///   queued alarm before any normal message.
///
/// The queue never looks inside payloads; ownership moves in on send and out
/// on receive.
pub struct AlarmQueue<T> {
    state: Mutex<State<T>>,
    message_sent: Condvar,
    alarm_received: Condvar,
}

impl<T> AlarmQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                messages: VecDeque::new(),
                alarms: 0,
            }),
            message_sent: Condvar::new(),
            alarm_received: Condvar::new(),
        }
    }

    /// Create a queue with `capacity` message slots reserved up front.
    ///
    /// Fails with [`Error::AllocationFailure`](crate::Error::AllocationFailure)
    /// if the reservation cannot be satisfied.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut messages = VecDeque::new();
        messages.try_reserve(capacity)?;

        Ok(Self {
            state: Mutex::new(State {
                messages,
                alarms: 0,
            }),
            message_sent: Condvar::new(),
            alarm_received: Condvar::new(),
        })
    }

    /// Append a message at the tail.
    ///
    /// An alarm waits here until the alarm slot is free. Every send wakes
    /// one blocked receiver.
    pub fn send(&self, payload: T, kind: MsgKind) {
        let mut state = self.state.lock();

        if kind == MsgKind::Alarm {
            while state.alarms > 0 {
                self.alarm_received.wait(&mut state);
            }
            state.alarms += 1;
        }

        state.messages.push_back(Message::new(payload, kind));
        self.message_sent.notify_one();
    }

    /// Remove the next message, blocking while the queue is empty.
    pub fn recv(&self) -> Message<T> {
        let mut state = self.state.lock();

        loop {
            if let Some(msg) = state.pop_next() {
                if msg.is_alarm() {
                    self.alarm_received.notify_one();
                }
                return msg;
            }
            self.message_sent.wait(&mut state);
        }
    }

    /// Non-blocking [`recv`](Self::recv); `None` when the queue is empty.
    pub fn try_recv(&self) -> Option<Message<T>> {
        let mut state = self.state.lock();
        let msg = state.pop_next()?;
        if msg.is_alarm() {
            self.alarm_received.notify_one();
        }
        Some(msg)
    }

    /// Number of queued messages of either kind.
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().messages.is_empty()
    }

    /// Number of queued alarms; always 0 or 1.
    pub fn alarms(&self) -> usize {
        self.state.lock().alarms
    }
}

impl<T> Default for AlarmQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for AlarmQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("AlarmQueue");
        match self.state.try_lock() {
            Some(state) => dbg
                .field("len", &state.messages.len())
                .field("alarms", &state.alarms)
                .finish(),
            None => dbg.finish_non_exhaustive(),
        }
    }
}
