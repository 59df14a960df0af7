//! Item history: id generation and the append-only item store.

mod generator;
mod store;

pub use generator::IdGenerator;
pub use store::ItemStore;
