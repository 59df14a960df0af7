//! Core types for the broadcast hub.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Unique identifier for a published item.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time. A clock set before the epoch reads as zero.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp(micros)
    }

    /// Current time minus `age`.
    pub fn ago(age: Duration) -> Self {
        let now = Self::now();
        let age = i64::try_from(age.as_micros()).unwrap_or(i64::MAX);
        Timestamp(now.0.saturating_sub(age))
    }

    /// Whole seconds since the epoch.
    pub fn as_secs(&self) -> i64 {
        self.0 / 1_000_000
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A published news item.
///
/// Items are immutable once published: the hub never edits or evicts them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier (assigned by the hub).
    pub id: ItemId,

    pub title: String,

    /// Opaque body text.
    pub content: String,

    /// When the item was published (assigned by the hub).
    pub published_at: Timestamp,

    pub category: String,

    pub author: String,
}

/// Input for publishing a new item (before id/timestamp assigned).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub title: String,
    pub content: String,
    pub category: String,
    pub author: String,
}

impl ItemInput {
    /// Create a new item input.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: category.into(),
            author: author.into(),
        }
    }

    /// Stamp this input into an item.
    pub(crate) fn into_item(self, id: ItemId, published_at: Timestamp) -> Item {
        Item {
            id,
            title: self.title,
            content: self.content,
            published_at,
            category: self.category,
            author: self.author,
        }
    }
}
