//! Unauthenticated liveness and version endpoints, reachable even before
//! setup completes (`security::is_setup_whitelisted`).

use axum::extract::State;
use axum::response::Json;

use crate::state::GatewayState;

pub async fn health(State(_state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn info(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "configured": state.is_configured(),
    }))
}
