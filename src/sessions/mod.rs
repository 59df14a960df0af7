//! Subscriber sessions.
//!
//! Two kinds of session are handed out by the hub:
//! - [`ItemStream`]: backlog replay followed by the live item tail. Counted
//!   in the subscriber registry while attached.
//! - [`CountStream`]: the current subscriber count followed by every change.
//!
//! Both are potentially infinite, blocking iterators. They end on explicit
//! cancel (directly or through a [`CancelHandle`]), on hub shutdown, or when
//! their buffer overflows. Item streams also end on a delivery failure.
//!
//! # Example
//!
//! ```ignore
//! let mut stream = hub.subscribe_to_items()?;
//! let handle = stream.cancel_handle();
//!
//! // On client disconnect, from the transport's thread:
//! // handle.cancel();
//!
//! loop {
//!     match stream.recv() {
//!         Ok(item) => send_event(&item),
//!         Err(reason) => break,
//!     }
//! }
//! ```

mod count;
mod news;
mod types;

pub use count::CountStream;
pub use news::ItemStream;
pub use types::{CancelHandle, SessionId, SessionState, TerminationReason};
