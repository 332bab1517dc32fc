//! Workspace-scoped endpoints: settings and audit-log visibility. Every
//! handler checks the caller's workspace matches the target (or that
//! they're a super-admin) before touching the row.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::auth::resolve_caller;
use crate::state::GatewayState;

pub async fn get_workspace(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let ws = hub_store::repo::workspace::find_by_id(&state.services.pool, caller.workspace_id)
        .await?
        .ok_or_else(|| hub_domain::Error::NotFound(format!("workspace {}", caller.workspace_id)))?;
    Ok(Json(serde_json::to_value(ws).map_err(hub_domain::Error::from)?))
}

#[derive(Deserialize)]
pub struct AuditQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub async fn list_audit_logs(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Query(q): Query<AuditQuery>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;
    hub_auth::authorization::require_permission(&caller.user, &runtime.super_admin_emails, hub_auth::permissions::permission::WORKSPACE_AUDIT)?;

    let logs = state.services.auditor.list_for_workspace(caller.workspace_id, q.limit).await?;
    Ok(Json(serde_json::json!({ "logs": logs })))
}
