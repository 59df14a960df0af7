//! Multicast buses for fanning values out to many taps.
//!
//! The hub runs two of these: one carrying published items and one carrying
//! subscriber count changes. Each tap owns a bounded queue:
//! - A publish never blocks; it pushes into every tap with `try_send`
//! - A tap whose queue is full is either removed (the owner drains what was
//!   queued and then sees the tap disconnect) or has its oldest value
//!   discarded, depending on the bus's [`OverflowPolicy`]
//! - Closing the bus removes every tap and refuses new ones
//!
//! # Example
//!
//! ```ignore
//! let bus = Bus::new("items", 1024);
//! let tap = bus.tap()?;
//!
//! bus.publish(item)?;
//! let received = tap.recv()?;
//! ```

mod multicast;
mod types;

pub use multicast::Bus;
pub use types::{OverflowPolicy, PublishReport, Tap, TapId};
