//! Per-user OAuth credential CRUD. Secrets never leave the
//! store decrypted except in the direct response to the owning user.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::auth::resolve_caller;
use crate::state::GatewayState;

#[derive(Deserialize)]
pub struct ProviderQuery {
    provider: String,
}

pub async fn list_credentials(state: State<GatewayState>, headers: HeaderMap, jar: CookieJar) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let creds = hub_tools::credential::list_credentials(&state.services.pool, caller.user.id).await?;
    Ok(Json(serde_json::json!({ "credentials": creds })))
}

pub async fn store_credential(
    state: State<GatewayState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(tool_name): Path<String>,
    Query(q): Query<ProviderQuery>,
    Json(secrets): Json<Value>,
) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    hub_tools::credential::store_credential(&state.services.pool, &state.services.cipher, caller.user.id, &tool_name, &q.provider, &secrets).await?;
    Ok(Json(serde_json::json!({ "stored": true })))
}

pub async fn get_credential(
    state: State<GatewayState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(tool_name): Path<String>,
    Query(q): Query<ProviderQuery>,
) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    let value = hub_tools::credential::get_credential(&state.services.pool, &state.services.cipher, caller.user.id, &tool_name, &q.provider).await?;
    Ok(Json(value.unwrap_or(Value::Null)))
}

pub async fn delete_credential(
    state: State<GatewayState>,
    headers: HeaderMap,
    jar: CookieJar,
    Path(tool_name): Path<String>,
    Query(q): Query<ProviderQuery>,
) -> ApiResult<Json<Value>> {
    let caller = resolve_caller(&state, &headers, &jar).await?;
    hub_tools::credential::delete_credential(&state.services.pool, caller.user.id, &tool_name, &q.provider).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
