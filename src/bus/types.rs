//! Tap and publish result types.

use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::time::Duration;

/// Unique identifier for a tap on a bus.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapId(pub u64);

impl fmt::Debug for TapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TapId({})", self.0)
    }
}

impl fmt::Display for TapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Listening end of a bus.
///
/// Receives every value published after the tap was opened. Disconnects
/// once the tap is removed from the bus (untap, overflow or close) and its
/// queue is drained.
pub struct Tap<T> {
    pub id: TapId,
    /// Channel to receive values.
    pub receiver: Receiver<T>,
}

impl<T> Tap<T> {
    /// Receive the next value (blocking).
    pub fn recv(&self) -> Result<T, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a value (non-blocking).
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Number of values waiting in the queue.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// What a bus does with a tap whose queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Remove the tap. Its owner drains what was queued, then sees the tap
    /// disconnect.
    Disconnect,
    /// Discard the oldest queued value and keep the tap. For feeds where
    /// only recent values matter. Such taps are pruned only by untap or
    /// close, never by the receiver going away.
    DropOldest,
}

/// Outcome of a single publish.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Taps the value was queued on.
    pub delivered: usize,
    /// Of those, taps that had their oldest value discarded to make room.
    pub coalesced: usize,
    /// Taps removed because their queue was full.
    pub overflowed: Vec<TapId>,
    /// Taps removed because their receiver was gone.
    pub disconnected: usize,
}

impl PublishReport {
    /// True if every tap that existed at publish time got the value.
    pub fn is_clean(&self) -> bool {
        self.overflowed.is_empty() && self.disconnected == 0
    }
}
