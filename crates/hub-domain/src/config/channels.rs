use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inter-agent message channels
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Document holding every channel's pending queue.
    #[serde(default = "d_channels_path")]
    pub channels_path: PathBuf,
    /// Document holding bounded per-channel history.
    #[serde(default = "d_history_path")]
    pub history_path: PathBuf,
    /// Max messages retained per channel's history ring buffer.
    #[serde(default = "d_history_capacity")]
    pub history_capacity: usize,
    /// Poll interval for `listen()` when no message is immediately ready.
    #[serde(default = "d_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            channels_path: d_channels_path(),
            history_path: d_history_path(),
            history_capacity: d_history_capacity(),
            poll_interval_ms: d_poll_interval_ms(),
        }
    }
}

fn d_channels_path() -> PathBuf {
    PathBuf::from("./data/channels.json")
}
fn d_history_path() -> PathBuf {
    PathBuf::from("./data/history.json")
}
fn d_history_capacity() -> usize {
    500
}
fn d_poll_interval_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_poll_interval_is_100ms() {
        assert_eq!(ChannelsConfig::default().poll_interval_ms, 100);
    }
}
