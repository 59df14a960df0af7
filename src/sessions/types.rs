//! Session lifecycle types.

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Unique identifier for a session (item stream or count stream).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an item session.
///
/// `Init -> Replaying -> Live -> Terminated`. A session may also terminate
/// straight from `Replaying`. `Terminated` is absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not yet counted.
    Init,
    /// Counted; draining the backlog snapshot.
    Replaying,
    /// Counted; backlog drained, following the live tail.
    Live,
    /// Detached for good.
    Terminated,
}

impl SessionState {
    /// Whether a session in this state counts as a live subscriber.
    pub fn is_attached(self) -> bool {
        matches!(self, SessionState::Replaying | SessionState::Live)
    }
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Subscriber went away or cancelled explicitly.
    Cancelled,
    /// The hub shut down.
    Shutdown,
    /// Tap buffer overflowed (slow consumer).
    Overflow,
    /// Handing an item to the transport failed.
    DeliveryFailed(String),
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Cancelled => write!(f, "cancelled"),
            TerminationReason::Shutdown => write!(f, "shutdown"),
            TerminationReason::Overflow => write!(f, "buffer overflow"),
            TerminationReason::DeliveryFailed(e) => write!(f, "delivery failed: {}", e),
        }
    }
}

/// Something that can be ended from another thread.
pub(crate) trait Cancel: Send + Sync {
    /// End the session. Returns true if this call ended it.
    fn cancel(&self) -> bool;

    fn is_terminated(&self) -> bool;
}

/// Thread-safe handle that ends a session.
///
/// The transport keeps one of these next to its connection and calls
/// [`CancelHandle::cancel`] on disconnect. A thread blocked receiving from the
/// session wakes up and sees the stream end.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<dyn Cancel>,
}

impl CancelHandle {
    pub(crate) fn new(inner: Arc<dyn Cancel>) -> Self {
        Self { inner }
    }

    /// End the session. Returns true if this call ended it, false if it had
    /// already ended.
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }

    pub fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// How long a receive may wait.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Wait {
    Forever,
    Until(Instant),
    Never,
}

impl Wait {
    /// Receive from `receiver` under this wait mode.
    ///
    /// `Ok(None)` means nothing arrived in time; `Err(())` means the channel
    /// is disconnected and drained.
    pub(crate) fn recv<T>(self, receiver: &Receiver<T>) -> Result<Option<T>, ()> {
        match self {
            Wait::Forever => receiver.recv().map(Some).map_err(|_| ()),
            Wait::Until(deadline) => match receiver.recv_deadline(deadline) {
                Ok(value) => Ok(Some(value)),
                Err(RecvTimeoutError::Timeout) => Ok(None),
                Err(RecvTimeoutError::Disconnected) => Err(()),
            },
            Wait::Never => match receiver.try_recv() {
                Ok(value) => Ok(Some(value)),
                Err(TryRecvError::Empty) => Ok(None),
                Err(TryRecvError::Disconnected) => Err(()),
            },
        }
    }
}
