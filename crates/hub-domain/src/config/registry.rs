use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool registry & catalogue discovery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directories scanned for `tool.toml` descriptors at startup.
    #[serde(default = "d_descriptor_dirs")]
    pub descriptor_dirs: Vec<PathBuf>,
    /// When set, descriptor directories are re-scanned on this interval
    /// (hot-reload). `None` disables polling — catalogue only refreshes
    /// on restart.
    #[serde(default)]
    pub watch_interval_secs: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            descriptor_dirs: d_descriptor_dirs(),
            watch_interval_secs: None,
        }
    }
}

fn d_descriptor_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("./tools")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_watch_is_disabled() {
        assert!(RegistryConfig::default().watch_interval_secs.is_none());
    }
}
