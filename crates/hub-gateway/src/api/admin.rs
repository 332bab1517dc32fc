//! Platform-wide super-admin endpoints: cross-workspace visibility,
//! gated by `hub_auth::authorization::require_super_admin`.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::auth::resolve_caller;
use crate::state::GatewayState;

pub async fn list_workspaces(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;
    hub_auth::authorization::require_super_admin(&caller.user, &runtime.super_admin_emails)?;

    let workspaces = hub_store::repo::workspace::all(&state.services.pool).await?;
    Ok(Json(serde_json::json!({ "workspaces": workspaces })))
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
    hub_auth::authorization::require_super_admin(&caller.user, &runtime.super_admin_emails)?;

    let logs = state.services.auditor.list_for_workspace(caller.workspace_id, q.limit).await?;
    Ok(Json(serde_json::json!({ "logs": logs })))
}
