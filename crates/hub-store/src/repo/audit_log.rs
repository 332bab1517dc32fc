use chrono::{DateTime, Utc};
use hub_domain::entities::{AuditActor, AuditLog, AuditTarget};
use hub_domain::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id: String,
    workspace_id: Option<String>,
    action: String,
    category: String,
    actor: String,
    target: String,
    request_id: Option<String>,
    ip: Option<String>,
    user_agent: Option<String>,
    success: bool,
    error_message: Option<String>,
    metadata: String,
    occurred_at: String,
}

impl TryFrom<AuditLogRow> for AuditLog {
    type Error = Error;

    fn try_from(row: AuditLogRow) -> Result<Self> {
        Ok(AuditLog {
            id: Uuid::parse_str(&row.id).map_err(|e| Error::Store(e.to_string()))?,
            workspace_id: row
                .workspace_id
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .map_err(|e| Error::Store(e.to_string()))?,
            action: row.action,
            category: row.category,
            actor: serde_json::from_str::<AuditActor>(&row.actor).map_err(|e| Error::Store(e.to_string()))?,
            target: serde_json::from_str::<AuditTarget>(&row.target).map_err(|e| Error::Store(e.to_string()))?,
            request_id: row.request_id,
            ip: row.ip,
            user_agent: row.user_agent,
            success: row.success,
            error_message: row.error_message,
            metadata: serde_json::from_str(&row.metadata).unwrap_or(serde_json::json!({})),
            occurred_at: DateTime::parse_from_rfc3339(&row.occurred_at)
                .map_err(|e| Error::Store(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

/// Append-only: there is no update or delete path here beyond retention purge.
pub async fn insert(pool: &SqlitePool, entry: &AuditLog) -> Result<()> {
    sqlx::query(
        "INSERT INTO audit_log
            (id, workspace_id, action, category, actor, target, request_id, ip, user_agent, success, error_message, metadata, occurred_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.id.to_string())
    .bind(entry.workspace_id.map(|id| id.to_string()))
    .bind(&entry.action)
    .bind(&entry.category)
    .bind(serde_json::to_string(&entry.actor).map_err(|e| Error::Store(e.to_string()))?)
    .bind(serde_json::to_string(&entry.target).map_err(|e| Error::Store(e.to_string()))?)
    .bind(&entry.request_id)
    .bind(&entry.ip)
    .bind(&entry.user_agent)
    .bind(entry.success)
    .bind(&entry.error_message)
    .bind(entry.metadata.to_string())
    .bind(entry.occurred_at.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn list_for_workspace(pool: &SqlitePool, workspace_id: Uuid, limit: i64) -> Result<Vec<AuditLog>> {
    let rows: Vec<AuditLogRow> = sqlx::query_as(
        "SELECT id, workspace_id, action, category, actor, target, request_id, ip, user_agent, success, error_message, metadata, occurred_at
         FROM audit_log WHERE workspace_id = ? ORDER BY occurred_at DESC LIMIT ?",
    )
    .bind(workspace_id.to_string())
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(AuditLog::try_from).collect()
}

/// Deletes rows older than `cutoff`; returns the number removed. Driven by
/// `AuditConfig::retention_days`; a `None` retention means this is never called.
pub async fn purge_older_than(pool: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM audit_log WHERE occurred_at < ?")
        .bind(cutoff.to_rfc3339())
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(result.rows_affected())
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

    fn sample(workspace_id: Uuid, occurred_at: DateTime<Utc>) -> AuditLog {
        AuditLog {
            id: Uuid::new_v4(),
            workspace_id: Some(workspace_id),
            action: "tool.invoked".into(),
            category: "tool".into(),
            actor: AuditActor { id: Some("u1".into()), email: Some("jane@example.com".into()), actor_type: "user".into() },
            target: AuditTarget { target_type: "tool".into(), id: Some("github".into()), name: Some("GitHub".into()) },
            request_id: Some("req-1".into()),
            ip: None,
            user_agent: None,
            success: true,
            error_message: None,
            metadata: serde_json::json!({}),
            occurred_at,
        }
    }

    #[tokio::test]
    async fn insert_then_list_for_workspace() {
        let pool = memory_pool().await;
        let ws_id = Uuid::new_v4();
        insert(&pool, &sample(ws_id, Utc::now())).await.unwrap();
        let rows = list_for_workspace(&pool, ws_id, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "tool.invoked");
    }

    #[tokio::test]
    async fn purge_older_than_removes_expired_rows() {
        let pool = memory_pool().await;
        let ws_id = Uuid::new_v4();
        let old = Utc::now() - chrono::Duration::days(100);
        insert(&pool, &sample(ws_id, old)).await.unwrap();
        insert(&pool, &sample(ws_id, Utc::now())).await.unwrap();
        let cutoff = Utc::now() - chrono::Duration::days(30);
        let removed = purge_older_than(&pool, cutoff).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(list_for_workspace(&pool, ws_id, 10).await.unwrap().len(), 1);
    }
}
