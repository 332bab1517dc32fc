//! Authenticated per-user tool management: catalogue annotation, config
//! CRUD, and instance lifecycle actions.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum_extra::extract::CookieJar;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::auth::resolve_caller;
use crate::state::GatewayState;

pub async fn catalogue(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let entries = hub_tools::catalogue::get_catalogue(&state.services.pool, caller.user.id).await?;
    Ok(Json(serde_json::json!({ "tools": entries })))
}

pub async fn add_tool(
    state: State<GatewayState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(tool_name): Path<String>,
    Json(config): Json<Value>,
) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    hub_tools::catalogue::add_tool(&state.services.pool, caller.user.id, &tool_name, &config).await?;
    state
        .services
        .auditor
        .log_tool(
            "tool.added",
            caller.workspace_id,
            hub_domain::entities::AuditActor {
                id: Some(caller.user.id.to_string()),
                email: Some(caller.user.email.clone()),
                actor_type: "user".into(),
            },
            &tool_name,
            &hub_audit::RequestContext { request_id: None, ip: None, user_agent: None },
            true,
            None,
        )
        .await
        .ok();
    Ok(Json(serde_json::json!({ "added": true })))
}

pub async fn remove_tool(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    hub_tools::catalogue::remove_tool(&state.services.pool, caller.user.id, &tool_name).await?;
    state.services.instances.stop_all_user_tools(caller.user.id);
    Ok(Json(serde_json::json!({ "removed": true })))
}

pub async fn get_config(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let config = hub_tools::catalogue::get_tool_config(&state.services.pool, caller.user.id, &tool_name).await?;
    Ok(Json(config))
}

pub async fn update_config(
    state: State<GatewayState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(tool_name): Path<String>,
    Json(partial): Json<Value>,
) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    hub_tools::catalogue::update_tool_config(&state.services.pool, caller.user.id, &tool_name, &partial).await?;
    state.services.instances.stop_all_user_tools(caller.user.id);
    Ok(Json(serde_json::json!({ "updated": true })))
}

pub async fn missing_config(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let missing = hub_tools::catalogue::get_missing_config(&state.services.pool, caller.user.id, &tool_name).await?;
    Ok(Json(serde_json::json!({ "missing": missing })))
}

pub async fn start_instance(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let instance = state.services.instances.start(caller.user.id, &tool_name)?;
    Ok(Json(serde_json::to_value(instance).map_err(hub_domain::Error::from)?))
}

pub async fn stop_instance(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let instance = state.services.instances.stop(caller.user.id, &tool_name)?;
    Ok(Json(serde_json::to_value(instance).map_err(hub_domain::Error::from)?))
}

pub async fn refresh_instance(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let instance = state.services.instances.refresh(caller.user.id, &tool_name)?;
    Ok(Json(serde_json::to_value(instance).map_err(hub_domain::Error::from)?))
}

pub async fn instance_status(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar, Path(tool_name): Path<String>) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let instance = state.services.instances.get(caller.user.id, &tool_name);
    Ok(Json(serde_json::to_value(instance).map_err(hub_domain::Error::from)?))
}

pub async fn list_my_tools(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let running = state.services.instances.list_user_tools(caller.user.id);
    Ok(Json(serde_json::json!({ "running": running })))
}
