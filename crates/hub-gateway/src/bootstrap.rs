//! Startup sequence: open the store, seed first-boot secrets, construct
//! every library crate's service handle, and spawn the background tasks
//! each one owns. One big state struct built up field by field, then a
//! handful of `tokio::spawn` periodic loops for the background work each
//! service owns.

use std::sync::Arc;

use hub_audit::Auditor;
use hub_auth::HubSessionResolver;
use hub_channels::ChannelHub;
use hub_crypto::CipherSuite;
use hub_domain::config::Config;
use hub_domain::Result;
use hub_instances::InstanceManager;
use hub_protocol::dispatch::HubServices;
use hub_protocol::middleware::{Pipeline, RequestLoggingStage, SessionAwareStage, UserConfigStage};
use hub_registry::Registry;
use hub_store::bootstrap;
use hub_store::repo::system_config;
use hub_store::RuntimeConfigCache;
use hub_timers::TimerManager;
use parking_lot::RwLock;

use crate::state::GatewayState;

const KEY_ENCRYPTION_SALT: &str = "encryption_salt";
const KEY_LOCAL_SESSION_SECRET: &str = "local_session_secret";

/// Generates and persists the HMAC key `local_session` cookies are signed
/// with, the first time the Hub boots. Seeded once, alongside the
/// encryption salt, and never rotated automatically — rotating it would
/// invalidate every live session with no warning.
async fn seed_local_session_secret_if_absent(pool: &sqlx::SqlitePool) -> Result<String> {
    if let Some(existing) = system_config::get(pool, KEY_LOCAL_SESSION_SECRET).await? {
        return Ok(existing);
    }
    let secret = hub_crypto::secret::generate_salt();
    let encoded = hex::encode(secret);
    system_config::set(pool, KEY_LOCAL_SESSION_SECRET, &encoded, true).await?;
    tracing::info!("bootstrap: seeded local_session signing secret");
    Ok(encoded)
}

/// Runs the full bootstrap sequence and returns a ready-to-serve
/// `GatewayState`. Called once from `main` before any transport starts
/// accepting requests.
pub async fn build(config: Config) -> Result<GatewayState> {
    let (pool, state) = bootstrap::run(&config.store.database_url, config.store.max_connections).await?;

    bootstrap::import_env_on_first_boot(&pool).await?;

    let salt_hex = system_config::get(&pool, KEY_ENCRYPTION_SALT)
        .await?
        .ok_or_else(|| hub_domain::Error::Config("encryption salt missing after bootstrap".into()))?;
    let salt = hex::decode(&salt_hex).map_err(|e| hub_domain::Error::Config(format!("encryption salt is not valid hex: {e}")))?;
    let cipher = CipherSuite::from_salt(&salt)?;

    let local_signing_secret = seed_local_session_secret_if_absent(&pool).await?;

    let channels = Arc::new(ChannelHub::new(&config.channels));
    let timers = Arc::new(TimerManager::new(config.timers.clone()));
    let instances = Arc::new(InstanceManager::new());
    let registry = Arc::new(Registry::new(pool.clone(), config.registry.descriptor_dirs.clone()));
    let auditor = Auditor::new(pool.clone());

    let synced = registry.sync().await?;
    tracing::info!(tool_count = synced, "bootstrap: synced tool registry");

    hub_audit::spawn_retention_purge(Arc::new(pool.clone()), config.audit.retention_days);
    hub_registry::spawn_watch(registry.clone(), config.registry.watch_interval_secs);

    let services = HubServices {
        pool: pool.clone(),
        cipher: cipher.clone(),
        channels,
        timers,
        instances,
        registry,
        auditor,
    };

    let resolver = Arc::new(HubSessionResolver::new(local_signing_secret, cipher, pool.clone()));

    let pipeline = Arc::new(Pipeline::new(vec![
        Box::new(SessionAwareStage { resolver: resolver.clone() }),
        Box::new(UserConfigStage { pool: pool.clone() }),
        Box::new(RequestLoggingStage),
    ]));

    let runtime_config = Arc::new(RuntimeConfigCache::new(config.store.runtime_config_ttl_secs));

    Ok(GatewayState {
        config: Arc::new(config),
        services,
        runtime_config,
        pipeline,
        resolver,
        bootstrap_state: Arc::new(RwLock::new(state)),
    })
}
