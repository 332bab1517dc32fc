//! Per-user tool instance lifecycle (spec.md §4.5).

pub mod manager;

pub use manager::{Instance, InstanceManager, InstanceStatus, SharedInstanceManager};
