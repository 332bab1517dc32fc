use hub_domain::capability::ToolCapabilities;
use hub_domain::entities::{AuthType, ToolRegistryEntry};
use hub_domain::{Error, Result};
use sqlx::SqlitePool;

#[derive(sqlx::FromRow)]
struct ToolRegistryRow {
    tool_name: String,
    display_name: String,
    description: String,
    category: String,
    auth_type: String,
    config_schema: String,
    required_oauth: Option<String>,
    capabilities: i64,
}

impl TryFrom<ToolRegistryRow> for ToolRegistryEntry {
    type Error = Error;

    fn try_from(row: ToolRegistryRow) -> Result<Self> {
        let auth_type = match row.auth_type.as_str() {
            "none" => AuthType::None,
            "key" => AuthType::Key,
            "o_auth" | "oauth" => AuthType::OAuth,
            other => return Err(Error::Store(format!("unknown auth_type: {other}"))),
        };
        Ok(ToolRegistryEntry {
            tool_name: row.tool_name,
            display_name: row.display_name,
            description: row.description,
            category: row.category,
            auth_type,
            config_schema: serde_json::from_str(&row.config_schema).unwrap_or(serde_json::json!({})),
            required_oauth: row.required_oauth,
            capabilities: ToolCapabilities::from_bits_truncate(row.capabilities as u16),
        })
    }
}

fn auth_type_str(auth_type: AuthType) -> &'static str {
    match auth_type {
        AuthType::None => "none",
        AuthType::Key => "key",
        AuthType::OAuth => "oauth",
    }
}

/// Upserted on startup by registry discovery — a tool descriptor found on
/// disk always wins over whatever was previously catalogued.
pub async fn upsert(pool: &SqlitePool, entry: &ToolRegistryEntry) -> Result<()> {
    sqlx::query(
        "INSERT INTO tool_registry
            (tool_name, display_name, description, category, auth_type, config_schema, required_oauth, capabilities)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(tool_name) DO UPDATE SET
            display_name = excluded.display_name,
            description = excluded.description,
            category = excluded.category,
            auth_type = excluded.auth_type,
            config_schema = excluded.config_schema,
            required_oauth = excluded.required_oauth,
            capabilities = excluded.capabilities",
    )
    .bind(&entry.tool_name)
    .bind(&entry.display_name)
    .bind(&entry.description)
    .bind(&entry.category)
    .bind(auth_type_str(entry.auth_type))
    .bind(entry.config_schema.to_string())
    .bind(&entry.required_oauth)
    .bind(entry.capabilities.bits() as i64)
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn find_by_name(pool: &SqlitePool, tool_name: &str) -> Result<Option<ToolRegistryEntry>> {
    let row: Option<ToolRegistryRow> = sqlx::query_as(
        "SELECT tool_name, display_name, description, category, auth_type, config_schema, required_oauth, capabilities
         FROM tool_registry WHERE tool_name = ?",
    )
    .bind(tool_name)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    row.map(ToolRegistryEntry::try_from).transpose()
}

pub async fn all(pool: &SqlitePool) -> Result<Vec<ToolRegistryEntry>> {
    let rows: Vec<ToolRegistryRow> = sqlx::query_as(
        "SELECT tool_name, display_name, description, category, auth_type, config_schema, required_oauth, capabilities
         FROM tool_registry",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(ToolRegistryEntry::try_from).collect()
}

pub async fn delete(pool: &SqlitePool, tool_name: &str) -> Result<()> {
    sqlx::query("DELETE FROM tool_registry WHERE tool_name = ?")
        .bind(tool_name)
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
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

    fn sample() -> ToolRegistryEntry {
        ToolRegistryEntry {
            tool_name: "github".into(),
            display_name: "GitHub".into(),
            description: "Issue and PR access".into(),
            category: "dev".into(),
            auth_type: AuthType::OAuth,
            config_schema: serde_json::json!({"required": ["org"]}),
            required_oauth: Some("github".into()),
            capabilities: ToolCapabilities::REQUIRES_CREDENTIAL | ToolCapabilities::READS_DATA,
        }
    }

    #[tokio::test]
    async fn upsert_then_find_by_name() {
        let pool = memory_pool().await;
        upsert(&pool, &sample()).await.unwrap();
        let found = find_by_name(&pool, "github").await.unwrap().unwrap();
        assert_eq!(found.display_name, "GitHub");
        assert!(found.capabilities.contains(ToolCapabilities::READS_DATA));
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_entry() {
        let pool = memory_pool().await;
        upsert(&pool, &sample()).await.unwrap();
        let mut updated = sample();
        updated.display_name = "GitHub (v2)".into();
        upsert(&pool, &updated).await.unwrap();
        let found = find_by_name(&pool, "github").await.unwrap().unwrap();
        assert_eq!(found.display_name, "GitHub (v2)");
        assert_eq!(all(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let pool = memory_pool().await;
        upsert(&pool, &sample()).await.unwrap();
        delete(&pool, "github").await.unwrap();
        assert!(find_by_name(&pool, "github").await.unwrap().is_none());
    }
}
