//! Outbound event envelopes.
//!
//! The hub hands items and counts to a transport as plain values. A transport
//! that speaks an event-stream protocol wants an id and an event name with
//! each payload; [`StreamEvent`] carries exactly that and nothing about
//! framing.

use crate::error::Result;
use crate::types::Item;
use serde::Serialize;

/// Event name for published items.
pub const NEWS_EVENT: &str = "news";

/// Event name for subscriber count changes.
pub const COUNT_EVENT: &str = "count";

/// One outbound event: id, event name and payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StreamEvent<T> {
    pub id: String,
    pub event: &'static str,
    pub data: T,
}

impl<'a> StreamEvent<&'a Item> {
    /// Wrap an item; the event id is the item id.
    pub fn news(item: &'a Item) -> Self {
        Self {
            id: item.id.to_string(),
            event: NEWS_EVENT,
            data: item,
        }
    }
}

impl StreamEvent<u64> {
    /// Wrap a subscriber count; the event id is the count itself.
    pub fn count(count: u64) -> Self {
        Self {
            id: count.to_string(),
            event: COUNT_EVENT,
            data: count,
        }
    }
}

impl<T: Serialize> StreamEvent<T> {
    /// Serialize the payload alone as JSON.
    pub fn data_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.data)?)
    }

    /// Serialize the whole envelope as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
