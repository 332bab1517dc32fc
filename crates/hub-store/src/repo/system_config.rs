use hub_domain::{entities::SystemConfig, Error, Result};
use sqlx::SqlitePool;

pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM system_config WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(row.map(|(v,)| v))
}

pub async fn set(pool: &SqlitePool, key: &str, value: &str, is_secret: bool) -> Result<()> {
    sqlx::query(
        "INSERT INTO system_config (key, value, is_secret) VALUES (?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, is_secret = excluded.is_secret",
    )
    .bind(key)
    .bind(value)
    .bind(is_secret)
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM system_config WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn all(pool: &SqlitePool) -> Result<Vec<SystemConfig>> {
    let rows: Vec<(String, String, bool)> =
        sqlx::query_as("SELECT key, value, is_secret FROM system_config")
            .fetch_all(pool)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
    Ok(rows
        .into_iter()
        .map(|(key, value, is_secret)| SystemConfig { key, value, is_secret })
        .collect())
}
