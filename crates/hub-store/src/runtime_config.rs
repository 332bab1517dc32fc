use std::sync::Arc;
use std::time::{Duration, Instant};

use hub_domain::config::Config;
use hub_domain::Result;
use parking_lot::RwLock;
use sqlx::SqlitePool;

use crate::repo::system_config;

/// Settings the gateway re-reads from `system_config` at most once per TTL,
/// so the setup wizard and the `config set` CLI can change them without a
/// restart. File-config values (`Config`) are the defaults; any matching
/// `system_config` row overrides them.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub hsts_enabled: bool,
    pub csp_report_uri: Option<String>,
    pub super_admin_emails: Vec<String>,
    /// HMAC key for `local_session` cookies; seeded at first boot, never
    /// rotated automatically.
    pub cookie_password: Option<String>,
}

impl RuntimeConfig {
    fn from_file_defaults(config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            allowed_origins: config.server.cors.allowed_origins.clone(),
            hsts_enabled: config.server.hsts_enabled,
            csp_report_uri: config.server.csp_report_uri.clone(),
            super_admin_emails: config.auth.super_admin_emails.clone(),
            cookie_password: None,
        }
    }

    async fn load(pool: &SqlitePool, config: &Config) -> Result<Self> {
        let mut runtime = Self::from_file_defaults(config);

        if let Some(host) = system_config::get(pool, "host").await? {
            runtime.host = host;
        }
        if let Some(port) = system_config::get(pool, "port").await? {
            if let Ok(port) = port.parse() {
                runtime.port = port;
            }
        }
        if let Some(origins) = system_config::get(pool, "allowed_origins").await? {
            runtime.allowed_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Some(hsts) = system_config::get(pool, "hsts_enabled").await? {
            runtime.hsts_enabled = hsts == "true";
        }
        if let Some(csp) = system_config::get(pool, "csp_report_uri").await? {
            runtime.csp_report_uri = Some(csp);
        }
        if let Some(emails) = system_config::get(pool, "super_admin_emails").await? {
            runtime.super_admin_emails = emails.split(',').map(|s| s.trim().to_string()).collect();
        }
        runtime.cookie_password = system_config::get(pool, "cookie_password").await?;

        Ok(runtime)
    }
}

struct Cache {
    ttl: Duration,
    entry: RwLock<Option<(Instant, Arc<RuntimeConfig>)>>,
}

/// Process-wide cached singleton. TTL is read from `StoreConfig` once at
/// construction; `invalidate()` forces the next `get_or_reload` to refetch
/// regardless of TTL, for callers that just wrote through the config API.
pub struct RuntimeConfigCache {
    cache: Cache,
}

impl RuntimeConfigCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            cache: Cache {
                ttl: Duration::from_secs(ttl_secs),
                entry: RwLock::new(None),
            },
        }
    }

    pub async fn get_or_reload(&self, pool: &SqlitePool, config: &Config) -> Result<Arc<RuntimeConfig>> {
        if let Some((fetched_at, value)) = self.cache.entry.read().clone() {
            if fetched_at.elapsed() < self.cache.ttl {
                return Ok(value);
            }
        }
        let fresh = Arc::new(RuntimeConfig::load(pool, config).await?);
        *self.cache.entry.write() = Some((Instant::now(), fresh.clone()));
        Ok(fresh)
    }

    pub fn invalidate(&self) {
        *self.cache.entry.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn load_falls_back_to_file_defaults() {
        let pool = memory_pool().await;
        let config = Config::default();
        let runtime = RuntimeConfig::load(&pool, &config).await.unwrap();
        assert_eq!(runtime.port, config.server.port);
        assert!(runtime.cookie_password.is_none());
    }

    #[tokio::test]
    async fn load_prefers_system_config_override() {
        let pool = memory_pool().await;
        system_config::set(&pool, "port", "9999", false).await.unwrap();
        let runtime = RuntimeConfig::load(&pool, &Config::default()).await.unwrap();
        assert_eq!(runtime.port, 9999);
    }

    #[tokio::test]
    async fn cache_returns_same_instance_within_ttl() {
        let pool = memory_pool().await;
        let cache = RuntimeConfigCache::new(60);
        let a = cache.get_or_reload(&pool, &Config::default()).await.unwrap();
        system_config::set(&pool, "port", "1234", false).await.unwrap();
        let b = cache.get_or_reload(&pool, &Config::default()).await.unwrap();
        assert_eq!(a.port, b.port, "within TTL, stale value must be served");
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let pool = memory_pool().await;
        let cache = RuntimeConfigCache::new(60);
        cache.get_or_reload(&pool, &Config::default()).await.unwrap();
        system_config::set(&pool, "port", "4321", false).await.unwrap();
        cache.invalidate();
        let refreshed = cache.get_or_reload(&pool, &Config::default()).await.unwrap();
        assert_eq!(refreshed.port, 4321);
    }
}
