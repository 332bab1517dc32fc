use hub_domain::config::{Config, ConfigSeverity};
use hub_store::repo::system_config;
use sqlx::SqlitePool;

/// Dump the resolved config — file defaults plus any `system_config`
/// overrides applied through `/setup` or `config set` — as TOML. Also
/// prints validation issues, if any, to stderr.
pub async fn show(config: &Config, pool: &SqlitePool) -> anyhow::Result<()> {
    let issues = config.validate();
    if !issues.is_empty() {
        let error_count = issues.iter().filter(|e| e.severity == ConfigSeverity::Error).count();
        for issue in &issues {
            eprintln!("{issue}");
        }
        eprintln!("\n{} error(s), {} warning(s)\n", error_count, issues.len() - error_count);
    }

    let overrides = system_config::all(pool).await?;
    print!("{}", toml::to_string_pretty(config)?);
    if !overrides.is_empty() {
        println!("\n# system_config overrides (take precedence at runtime):");
        for entry in overrides {
            let value = if entry.is_secret { "<secret>".to_string() } else { entry.value };
            println!("# {} = {}", entry.key, value);
        }
    }
    Ok(())
}

/// Set a single `system_config` key. Marks it secret when the key name
/// suggests sensitive material, matching the convention `setup.rs` uses
/// for `client_secret`/`cookie_password`.
pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> anyhow::Result<()> {
    let is_secret = key.contains("secret") || key.contains("password");
    system_config::set(pool, key, value, is_secret).await?;
    println!("{key} set");
    Ok(())
}

/// Delete a `system_config` key, reverting that setting to the config
/// file's default on next load.
pub async fn reset(pool: &SqlitePool, key: &str) -> anyhow::Result<()> {
    system_config::delete(pool, key).await?;
    println!("{key} reset to file default");
    Ok(())
}
