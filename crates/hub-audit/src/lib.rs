//! Structured append-only audit log over `hub_store::repo::audit_log`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hub_domain::entities::{AuditActor, AuditLog, AuditTarget};
use hub_domain::Result;
use hub_store::repo::audit_log;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Transport metadata common to every audited request; threaded through
/// middleware so each `log_*` call doesn't need its own parameter list.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct Auditor {
    pool: SqlitePool,
}

impl Auditor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn record(
        &self,
        action: &str,
        category: &str,
        workspace_id: Option<Uuid>,
        actor: AuditActor,
        target: AuditTarget,
        ctx: &RequestContext,
        success: bool,
        error_message: Option<String>,
        metadata: serde_json::Value,
    ) -> Result<()> {
        let entry = AuditLog {
            id: Uuid::new_v4(),
            workspace_id,
            action: action.to_string(),
            category: category.to_string(),
            actor,
            target,
            request_id: ctx.request_id.clone(),
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            success,
            error_message,
            metadata,
            occurred_at: Utc::now(),
        };
        audit_log::insert(&self.pool, &entry).await
    }

    /// `auth.login_succeeded`, `auth.login_failed`, `auth.mfa_enrolled`, …
    pub async fn log_auth(
        &self,
        action: &str,
        workspace_id: Option<Uuid>,
        actor: AuditActor,
        ctx: &RequestContext,
        success: bool,
        error_message: Option<String>,
    ) -> Result<()> {
        self.record(
            action,
            "auth",
            workspace_id,
            actor,
            AuditTarget { target_type: "session".into(), id: None, name: None },
            ctx,
            success,
            error_message,
            serde_json::json!({}),
        )
        .await
    }

    /// `tool.added`, `tool.removed`, `tool.invoked`, …
    pub async fn log_tool(
        &self,
        action: &str,
        workspace_id: Uuid,
        actor: AuditActor,
        tool_name: &str,
        ctx: &RequestContext,
        success: bool,
        error_message: Option<String>,
    ) -> Result<()> {
        self.record(
            action,
            "tool",
            Some(workspace_id),
            actor,
            AuditTarget { target_type: "tool".into(), id: Some(tool_name.into()), name: None },
            ctx,
            success,
            error_message,
            serde_json::json!({}),
        )
        .await
    }

    /// `credential.stored`, `credential.deleted`, `credential.refreshed`, …
    pub async fn log_credential(
        &self,
        action: &str,
        workspace_id: Uuid,
        actor: AuditActor,
        tool_name: &str,
        provider: &str,
        ctx: &RequestContext,
        success: bool,
    ) -> Result<()> {
        self.record(
            action,
            "credential",
            Some(workspace_id),
            actor,
            AuditTarget {
                target_type: "credential".into(),
                id: Some(format!("{tool_name}/{provider}")),
                name: None,
            },
            ctx,
            success,
            None,
            serde_json::json!({}),
        )
        .await
    }

    /// `admin.workspace_suspended`, `admin.super_admin_granted`, …
    pub async fn log_admin(
        &self,
        action: &str,
        actor: AuditActor,
        target: AuditTarget,
        ctx: &RequestContext,
        success: bool,
    ) -> Result<()> {
        self.record(action, "admin", None, actor, target, ctx, success, None, serde_json::json!({}))
            .await
    }

    /// `workspace.created`, `workspace.renamed`, …
    pub async fn log_workspace(
        &self,
        action: &str,
        workspace_id: Uuid,
        actor: AuditActor,
        ctx: &RequestContext,
        success: bool,
    ) -> Result<()> {
        self.record(
            action,
            "workspace",
            Some(workspace_id),
            actor,
            AuditTarget { target_type: "workspace".into(), id: Some(workspace_id.to_string()), name: None },
            ctx,
            success,
            None,
            serde_json::json!({}),
        )
        .await
    }

    pub async fn list_for_workspace(&self, workspace_id: Uuid, limit: i64) -> Result<Vec<AuditLog>> {
        audit_log::list_for_workspace(&self.pool, workspace_id, limit).await
    }
}

/// Wraps a tool invocation: on success emits `{tool_name}.invoked`, on
/// error emits `{tool_name}.invoked_failed` with the error's message.
pub async fn audit_tool_call<F, Fut, T>(
    auditor: &Auditor,
    workspace_id: Uuid,
    actor: AuditActor,
    tool_name: &str,
    ctx: &RequestContext,
    op: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    match op().await {
        Ok(value) => {
            auditor
                .log_tool("tool.invoked", workspace_id, actor, tool_name, ctx, true, None)
                .await?;
            Ok(value)
        }
        Err(err) => {
            let message = err.to_string();
            auditor
                .log_tool("tool.invoked_failed", workspace_id, actor, tool_name, ctx, false, Some(message))
                .await?;
            Err(err)
        }
    }
}

/// Spawns the periodic retention purge task, matching the teacher's
/// interval-loop pattern for background maintenance. A `None` retention
/// means rows are kept forever and this is a no-op.
pub fn spawn_retention_purge(pool: Arc<SqlitePool>, retention_days: Option<u32>) {
    let Some(days) = retention_days else {
        return;
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(24 * 3_600));
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::days(days as i64);
            match audit_log::purge_older_than(&pool, cutoff).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "audit retention purge removed expired rows")
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(%err, "audit retention purge failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_store::pool;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    fn actor() -> AuditActor {
        AuditActor { id: Some("u1".into()), email: Some("jane@example.com".into()), actor_type: "user".into() }
    }

    #[tokio::test]
    async fn log_auth_records_success() {
        let auditor = Auditor::new(memory_pool().await);
        let ws = Uuid::new_v4();
        auditor
            .log_auth("auth.login_succeeded", Some(ws), actor(), &RequestContext::default(), true, None)
            .await
            .unwrap();
        let rows = auditor.list_for_workspace(ws, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category, "auth");
        assert!(rows[0].success);
    }

    #[tokio::test]
    async fn audit_tool_call_logs_invoked_on_success() {
        let auditor = Auditor::new(memory_pool().await);
        let ws = Uuid::new_v4();
        let result: Result<u32> =
            audit_tool_call(&auditor, ws, actor(), "github", &RequestContext::default(), || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
        let rows = auditor.list_for_workspace(ws, 10).await.unwrap();
        assert_eq!(rows[0].action, "tool.invoked");
    }

    #[tokio::test]
    async fn audit_tool_call_logs_invoked_failed_on_error() {
        let auditor = Auditor::new(memory_pool().await);
        let ws = Uuid::new_v4();
        let result: Result<u32> = audit_tool_call(&auditor, ws, actor(), "github", &RequestContext::default(), || async {
            Err(hub_domain::Error::Tool { tool: "github".into(), message: "boom".into() })
        })
        .await;
        assert!(result.is_err());
        let rows = auditor.list_for_workspace(ws, 10).await.unwrap();
        assert_eq!(rows[0].action, "tool.invoked_failed");
        assert!(!rows[0].success);
    }
}
