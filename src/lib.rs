//! # Newscast
//!
//! An in-process news broadcast hub. Every subscriber first receives the full
//! backlog of published items and then every later item, in publish order,
//! with no gaps and no duplicates. The number of attached subscribers is
//! tracked exactly and exposed as its own live stream.
//!
//! ## Core Concepts
//!
//! - **Items**: Immutable news posts with hub-assigned ids and timestamps
//! - **Buses**: Bounded multicast channels, one for items and one for counts
//! - **Item streams**: Per-subscriber replay of the backlog, then the live tail
//! - **Count streams**: Current subscriber count, then every change
//!
//! Transport concerns (HTTP, event-stream framing) live outside this crate;
//! [`StreamEvent`] is the hand-off shape.
//!
//! ## Example
//!
//! ```ignore
//! use newscast::{Hub, HubConfig, ItemInput};
//!
//! let hub = Hub::with_config(HubConfig::default().with_welcome_items())?;
//!
//! let mut stream = hub.subscribe_to_items()?;
//! hub.publish(ItemInput::new("Breaking News", "...", "World", "Desk"))?;
//!
//! for item in stream.by_ref().take(3) {
//!     println!("{}: {}", item.id, item.title);
//! }
//! stream.cancel();
//! ```

pub mod bus;
pub mod error;
pub mod events;
pub mod hub;
pub mod items;
pub mod registry;
pub mod sessions;
pub mod types;

// Re-exports
pub use bus::{Bus, OverflowPolicy, PublishReport, Tap, TapId};
pub use error::{HubError, Result};
pub use events::{StreamEvent, COUNT_EVENT, NEWS_EVENT};
pub use hub::{welcome_items, Hub, HubConfig, HubStats, SeedItem};
pub use items::{IdGenerator, ItemStore};
pub use registry::SubscriberRegistry;
pub use sessions::{
    CancelHandle, CountStream, ItemStream, SessionId, SessionState, TerminationReason,
};
pub use types::*;
