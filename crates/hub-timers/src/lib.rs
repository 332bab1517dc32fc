//! Cooperative timer subsystem backing the `wait` tool (spec.md §4.10).

pub mod manager;

pub use manager::{SharedTimerManager, TimerManager};
