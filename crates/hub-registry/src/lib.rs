pub mod descriptor;
pub mod loader;
pub mod registry;

pub use registry::{spawn_watch, Registry};
