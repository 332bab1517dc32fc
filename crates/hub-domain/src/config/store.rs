use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Relational store (sqlx/SQLite, Postgres left as a documented swap)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `sqlx` connection string, e.g. `sqlite://./data/hub.db`.
    #[serde(default = "d_database_url")]
    pub database_url: String,
    #[serde(default = "d_max_connections")]
    pub max_connections: u32,
    /// TTL for the cached `RuntimeConfig` singleton (§4.1).
    #[serde(default = "d_runtime_config_ttl_secs")]
    pub runtime_config_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: d_database_url(),
            max_connections: d_max_connections(),
            runtime_config_ttl_secs: d_runtime_config_ttl_secs(),
        }
    }
}

fn d_database_url() -> String {
    "sqlite://./data/hub.db".into()
}
fn d_max_connections() -> u32 {
    5
}
fn d_runtime_config_ttl_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runtime_config_ttl_is_60s() {
        assert_eq!(StoreConfig::default().runtime_config_ttl_secs, 60);
    }
}
