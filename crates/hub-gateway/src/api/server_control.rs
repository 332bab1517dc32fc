//! Server control endpoints, reporting restart-required drift between
//! the running process and the latest applied configuration.
//!
//! There's no process supervisor wired in here — `/server/restart`
//! invalidates the cached `RuntimeConfig` and reports whether a change
//! actually requires a process restart (host/port bind) versus one the
//! cache invalidation already picked up (CORS origins, HSTS, CSP). Actually
//! re-executing the process is left to whatever deploys the Hub (systemd,
//! a container orchestrator) — restarting a process out from under itself
//! is not something to fake from inside the handler.

use axum::extract::State;
use axum::response::Json;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::state::GatewayState;

fn requires_process_restart(state: &GatewayState, runtime: &hub_store::RuntimeConfig) -> bool {
    state.config.server.host != runtime.host || state.config.server.port != runtime.port
}

pub async fn status(State(state): State<GatewayState>) -> ApiResult<Json<Value>> {
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;
    Ok(Json(serde_json::json!({
        "configured": state.is_configured(),
        "restart_required": requires_process_restart(&state, &runtime),
        "bound_host": state.config.server.host,
        "bound_port": state.config.server.port,
        "configured_host": runtime.host,
        "configured_port": runtime.port,
    })))
}

pub async fn apply_config(State(state): State<GatewayState>) -> ApiResult<Json<Value>> {
    state.runtime_config.invalidate();
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;
    let restart_required = requires_process_restart(&state, &runtime);
    Ok(Json(serde_json::json!({ "applied": true, "restart_required": restart_required })))
}

pub async fn health(State(_state): State<GatewayState>) -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn restart(State(state): State<GatewayState>) -> ApiResult<Json<Value>> {
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;
    if requires_process_restart(&state, &runtime) {
        tracing::warn!("restart requested but host/port changed — the running process cannot rebind itself; an external supervisor must restart it");
        return Ok(Json(serde_json::json!({ "restart_required": true, "restarted": false })));
    }
    state.runtime_config.invalidate();
    Ok(Json(serde_json::json!({ "restart_required": false, "restarted": true })))
}
