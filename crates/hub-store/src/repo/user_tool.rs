use hub_domain::entities::UserTool;
use hub_domain::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserToolRow {
    user_id: String,
    tool_name: String,
    enabled: bool,
}

impl TryFrom<UserToolRow> for UserTool {
    type Error = Error;

    fn try_from(row: UserToolRow) -> Result<Self> {
        Ok(UserTool {
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| Error::Store(e.to_string()))?,
            tool_name: row.tool_name,
            enabled: row.enabled,
        })
    }
}

pub async fn upsert(pool: &SqlitePool, entry: &UserTool) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_tool (user_id, tool_name, enabled) VALUES (?, ?, ?)
         ON CONFLICT(user_id, tool_name) DO UPDATE SET enabled = excluded.enabled",
    )
    .bind(entry.user_id.to_string())
    .bind(&entry.tool_name)
    .bind(entry.enabled)
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn find(pool: &SqlitePool, user_id: Uuid, tool_name: &str) -> Result<Option<UserTool>> {
    let row: Option<UserToolRow> =
        sqlx::query_as("SELECT user_id, tool_name, enabled FROM user_tool WHERE user_id = ? AND tool_name = ?")
            .bind(user_id.to_string())
            .bind(tool_name)
            .fetch_optional(pool)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
    row.map(UserTool::try_from).transpose()
}

pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<UserTool>> {
    let rows: Vec<UserToolRow> =
        sqlx::query_as("SELECT user_id, tool_name, enabled FROM user_tool WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_all(pool)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(UserTool::try_from).collect()
}

/// Used by the Instance Manager to remove a tool (and cascades to its
/// per-user config rows via the schema's FOREIGN KEY).
pub async fn delete(pool: &SqlitePool, user_id: Uuid, tool_name: &str) -> Result<()> {
    sqlx::query("DELETE FROM user_tool WHERE user_id = ? AND tool_name = ?")
        .bind(user_id.to_string())
        .bind(tool_name)
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}
