use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Timer subsystem (wait tool)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimersConfig {
    /// Upper bound on a single `wait` duration; requests beyond this are rejected.
    #[serde(default = "d_max_duration_ms")]
    pub max_duration_ms: u64,
    /// TTL for completed/cancelled timers before they're pruned from the map.
    #[serde(default = "d_cleanup_after_ms")]
    pub cleanup_after_ms: u64,
}

impl Default for TimersConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: d_max_duration_ms(),
            cleanup_after_ms: d_cleanup_after_ms(),
        }
    }
}

fn d_max_duration_ms() -> u64 {
    3_600_000
}
fn d_cleanup_after_ms() -> u64 {
    600_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_duration_is_one_hour() {
        assert_eq!(TimersConfig::default().max_duration_ms, 3_600_000);
    }
}
