pub mod bootstrap;
pub mod pool;
pub mod repo;
pub mod runtime_config;

pub use bootstrap::BootstrapState;
pub use runtime_config::{RuntimeConfig, RuntimeConfigCache};
