use hub_domain::entities::ToolConfig;
use hub_domain::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct ToolConfigRow {
    user_id: String,
    tool_name: String,
    config_key: String,
    config_value: String,
}

impl TryFrom<ToolConfigRow> for ToolConfig {
    type Error = Error;

    fn try_from(row: ToolConfigRow) -> Result<Self> {
        Ok(ToolConfig {
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| Error::Store(e.to_string()))?,
            tool_name: row.tool_name,
            config_key: row.config_key,
            config_value: row.config_value,
        })
    }
}

pub async fn set(pool: &SqlitePool, entry: &ToolConfig) -> Result<()> {
    sqlx::query(
        "INSERT INTO tool_config (user_id, tool_name, config_key, config_value) VALUES (?, ?, ?, ?)
         ON CONFLICT(user_id, tool_name, config_key) DO UPDATE SET config_value = excluded.config_value",
    )
    .bind(entry.user_id.to_string())
    .bind(&entry.tool_name)
    .bind(&entry.config_key)
    .bind(&entry.config_value)
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn list_for_user_tool(pool: &SqlitePool, user_id: Uuid, tool_name: &str) -> Result<Vec<ToolConfig>> {
    let rows: Vec<ToolConfigRow> = sqlx::query_as(
        "SELECT user_id, tool_name, config_key, config_value FROM tool_config
         WHERE user_id = ? AND tool_name = ?",
    )
    .bind(user_id.to_string())
    .bind(tool_name)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(ToolConfig::try_from).collect()
}

pub async fn delete_key(pool: &SqlitePool, user_id: Uuid, tool_name: &str, config_key: &str) -> Result<()> {
    sqlx::query("DELETE FROM tool_config WHERE user_id = ? AND tool_name = ? AND config_key = ?")
        .bind(user_id.to_string())
        .bind(tool_name)
        .bind(config_key)
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}
