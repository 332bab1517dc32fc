use crate::pool;
use crate::repo::system_config;
use hub_crypto::secret;
use hub_domain::Result;
use sqlx::SqlitePool;

/// The four states of spec.md §4.1's bootstrap FSM, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    NoDatabase,
    EmptyDatabase,
    Unconfigured,
    Configured,
}

const KEY_APP_MODE: &str = "app_mode";
const KEY_ENCRYPTION_SALT: &str = "encryption_salt";

/// Runs the full bootstrap sequence: create schema if missing, migrate,
/// seed the encryption salt on first boot, and report the resulting state.
/// Environment variables are only consulted here, on first boot — never
/// again afterward (spec.md §4.1).
pub async fn run(database_url: &str, max_connections: u32) -> Result<(SqlitePool, BootstrapState)> {
    let existed = database_exists(database_url);

    let pool = pool::connect(database_url, max_connections).await?;
    pool::migrate(&pool).await?;

    if !existed {
        tracing::info!("bootstrap: created schema, transitioning NO_DATABASE -> EMPTY_DATABASE");
    }

    seed_salt_if_absent(&pool).await?;

    let state = detect_state(&pool).await?;
    tracing::info!(?state, "bootstrap: resolved state");
    Ok((pool, state))
}

fn database_exists(database_url: &str) -> bool {
    database_url
        .strip_prefix("sqlite://")
        .map(std::path::Path::new)
        .map(|p| p.exists())
        .unwrap_or(false)
}

async fn seed_salt_if_absent(pool: &SqlitePool) -> Result<()> {
    if system_config::get(pool, KEY_ENCRYPTION_SALT).await?.is_some() {
        return Ok(());
    }
    let salt = secret::generate_salt();
    system_config::set(pool, KEY_ENCRYPTION_SALT, &hex::encode(salt), true).await?;
    tracing::info!("bootstrap: seeded encryption salt (EMPTY_DATABASE -> UNCONFIGURED)");
    if system_config::get(pool, KEY_APP_MODE).await?.is_none() {
        system_config::set(pool, KEY_APP_MODE, "unconfigured", false).await?;
    }
    Ok(())
}

/// Reads the persisted `app_mode` to determine which FSM state the
/// gateway should report. Called both at startup and whenever the setup
/// wizard completes.
pub async fn detect_state(pool: &SqlitePool) -> Result<BootstrapState> {
    if system_config::get(pool, KEY_ENCRYPTION_SALT).await?.is_none() {
        return Ok(BootstrapState::EmptyDatabase);
    }
    match system_config::get(pool, KEY_APP_MODE).await? {
        None => Ok(BootstrapState::EmptyDatabase),
        Some(mode) if mode == "unconfigured" => Ok(BootstrapState::Unconfigured),
        Some(mode) if mode == "local" || mode == "workos" => Ok(BootstrapState::Configured),
        Some(other) => {
            tracing::warn!(app_mode = %other, "unrecognized app_mode, treating as unconfigured");
            Ok(BootstrapState::Unconfigured)
        }
    }
}

/// Imports selected values from the process environment into the store.
/// Only ever called once, during first-boot bootstrap — after this,
/// environment variables are never consulted again except as an explicit
/// fallback during bootstrap itself (spec.md §4.1).
pub async fn import_env_on_first_boot(pool: &SqlitePool) -> Result<()> {
    let imports = [
        ("HUB_SUPER_ADMIN_EMAILS", "super_admin_emails"),
        ("HUB_HOST", "host"),
        ("HUB_PORT", "port"),
        ("HUB_WORKOS_CLIENT_ID", "workos_client_id"),
        ("HUB_WORKOS_CLIENT_SECRET", "workos_client_secret"),
    ];
    for (env_key, config_key) in imports {
        if let Ok(value) = std::env::var(env_key) {
            if system_config::get(pool, config_key).await?.is_none() {
                let is_secret = config_key.contains("secret");
                system_config::set(pool, config_key, &value, is_secret).await?;
            }
        }
    }
    Ok(())
}
