//! Inter-agent message channels (spec.md §4.9), the coordination core.

pub mod store;

pub use store::{ChannelHub, ListenOutcome};
