//! Public tool catalogue endpoints — no session required, since a caller
//! deciding whether to even log in needs to see what's on offer.

use axum::extract::{Path, State};
use axum::response::Json;

use crate::api::error::ApiResult;
use crate::state::GatewayState;

pub async fn list_tools(State(state): State<GatewayState>) -> ApiResult<Json<serde_json::Value>> {
    let tools = hub_tools::catalogue::list_available_tools(&state.services.pool).await?;
    Ok(Json(serde_json::json!({ "tools": tools })))
}

pub async fn tool_metadata(State(state): State<GatewayState>, Path(tool_name): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let entry = hub_tools::catalogue::get_tool_metadata(&state.services.pool, &tool_name).await?;
    let value = serde_json::to_value(entry).map_err(hub_domain::Error::from)?;
    Ok(Json(value))
}

pub async fn tool_schema(State(state): State<GatewayState>, Path(tool_name): Path<String>) -> ApiResult<Json<serde_json::Value>> {
    let entry = hub_tools::catalogue::get_tool_metadata(&state.services.pool, &tool_name).await?;
    Ok(Json(entry.config_schema))
}
