use hub_domain::{Error, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Opens the connection pool and runs a pre-flight connectivity check.
/// Per spec.md §4.1: any failure here is fail-fast, never a degraded boot.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(|e| Error::Store(format!("failed to connect to {database_url}: {e}")))?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| Error::Store(format!("pre-flight connectivity check failed: {e}")))?;

    Ok(pool)
}

/// Runs pending schema migrations. Migration failures abort startup
/// (spec.md §4.1's "migration failures → abort startup").
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| Error::Store(format!("migration failed: {e}")))
}
