//! Local-mode and WorkOS setup wizard. Every POST here
//! is only reachable while `BootstrapState != Configured` in spirit, but
//! the handlers themselves stay idempotent so re-running a step (e.g. the
//! browser retries after a network blip) doesn't corrupt state.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::Value;

use hub_domain::config::WorkOsConfig;
use hub_domain::entities::ProvisioningSource;
use hub_domain::Error;
use hub_store::repo::system_config;

use crate::api::error::ApiResult;
use crate::auth;
use crate::state::GatewayState;

pub async fn status(State(state): State<GatewayState>) -> ApiResult<Json<Value>> {
    let mode = system_config::get(&state.services.pool, "app_mode").await?.unwrap_or_else(|| "unconfigured".into());
    let setup_completed = state.is_configured();
    Ok(Json(serde_json::json!({
        "is_setup_required": !setup_completed,
        "current_mode": mode,
        "setup_completed": setup_completed,
    })))
}

pub async fn mode(State(state): State<GatewayState>) -> ApiResult<Json<Value>> {
    let mode = system_config::get(&state.services.pool, "app_mode").await?.unwrap_or_else(|| "unconfigured".into());
    Ok(Json(serde_json::json!({ "app_mode": mode })))
}

#[derive(Deserialize, Default)]
pub struct LocalSetupRequest {
    #[serde(default)]
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

fn default_local_email() -> String {
    "admin@localhost".into()
}

/// Provisions the single super-admin account Local Mode runs as, mints the
/// long-lived `omni_local_*` API key, and flips `app_mode` to `local`. An
/// empty request body is valid — Local Mode needs no operator-supplied
/// identity, so it falls back to a fixed local admin address.
pub async fn setup_local(
    State(state): State<GatewayState>,
    body: Option<Json<LocalSetupRequest>>,
) -> ApiResult<Json<Value>> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;

    let claims = hub_auth::provisioning::IdentityClaims {
        email: req.email.unwrap_or_else(default_local_email),
        given_name: req.given_name,
        family_name: req.family_name,
        provisioning_source: ProvisioningSource::Local,
    };
    let (user, workspace) = hub_auth::provisioning::get_or_create_user_and_workspace(
        &state.services.pool,
        claims,
        &runtime.super_admin_emails,
        state.config.auth.mfa_grace_days,
    )
    .await?;

    let api_key = auth::generate_local_api_key();
    auth::store_local_api_key(&state.services.pool, &api_key, user.id, workspace.id).await?;

    system_config::set(&state.services.pool, "app_mode", "local", false).await?;
    state.mark_configured();

    state
        .services
        .auditor
        .log_auth(
            "auth.local_setup_completed",
            Some(workspace.id),
            hub_domain::entities::AuditActor { id: Some(user.id.to_string()), email: Some(user.email.clone()), actor_type: "user".into() },
            &hub_audit::RequestContext { request_id: None, ip: None, user_agent: None },
            true,
            None,
        )
        .await
        .ok();

    Ok(Json(serde_json::json!({
        "user_id": user.id,
        "workspace_id": workspace.id,
        "api_key": api_key,
    })))
}

#[derive(Deserialize)]
pub struct WorkOsSetupRequest {
    pub client_id: String,
    pub client_secret: String,
    pub issuer_url: String,
    pub redirect_uri: String,
}

pub async fn setup_workos(State(state): State<GatewayState>, Json(req): Json<WorkOsSetupRequest>) -> ApiResult<Json<Value>> {
    let pool = &state.services.pool;
    system_config::set(pool, "workos_client_id", &req.client_id, false).await?;
    system_config::set(pool, "workos_client_secret", &req.client_secret, true).await?;
    system_config::set(pool, "workos_issuer_url", &req.issuer_url, false).await?;
    system_config::set(pool, "workos_redirect_uri", &req.redirect_uri, false).await?;

    if system_config::get(pool, "cookie_password").await?.is_none() {
        let secret = hub_crypto::secret::generate_salt();
        system_config::set(pool, "cookie_password", &hex::encode(secret), true).await?;
    }

    system_config::set(pool, "app_mode", "workos", false).await?;
    state.mark_configured();

    Ok(Json(serde_json::json!({ "configured": true })))
}

/// Builds an authorization URL from the staged config to prove it parses
/// into valid endpoints — the closest stand-in for the wizard's "test
/// API call" against the IdP short of an actual network round trip.
pub async fn validate_workos(State(state): State<GatewayState>, Json(req): Json<WorkOsSetupRequest>) -> ApiResult<Json<Value>> {
    let config = WorkOsConfig {
        client_id: req.client_id,
        client_secret_env: String::new(),
        issuer_url: req.issuer_url,
        redirect_uri: req.redirect_uri,
    };
    match hub_auth::sso_session::authorization_url(&config, &req.client_secret) {
        Ok((url, _)) => Ok(Json(serde_json::json!({ "valid": true, "authorization_url": url }))),
        Err(e) => Ok(Json(serde_json::json!({ "valid": false, "error": e.to_string() }))),
    }
}

pub async fn upgrade_to_workos(State(state): State<GatewayState>) -> ApiResult<Json<Value>> {
    let pool = &state.services.pool;
    for key in ["workos_client_id", "workos_client_secret", "workos_issuer_url", "workos_redirect_uri"] {
        if system_config::get(pool, key).await?.is_none() {
            return Err(Error::Validation(format!("missing {key} — run /setup/workos first")).into());
        }
    }
    system_config::set(pool, "app_mode", "workos", false).await?;
    state.runtime_config.invalidate();
    Ok(Json(serde_json::json!({ "upgraded": true })))
}

#[derive(Deserialize)]
pub struct NetworkConfigRequest {
    pub host: String,
    pub port: u16,
}

pub async fn network_config(State(state): State<GatewayState>, Json(req): Json<NetworkConfigRequest>) -> ApiResult<Json<Value>> {
    if req.port == 0 {
        return Err(Error::Validation("invalid-port-range".into()).into());
    }
    system_config::set(&state.services.pool, "host", &req.host, false).await?;
    system_config::set(&state.services.pool, "port", &req.port.to_string(), false).await?;
    state.runtime_config.invalidate();
    Ok(Json(serde_json::json!({ "applied": true, "restart_required": true })))
}

#[derive(Deserialize)]
pub struct DatabasePathRequest {
    pub path: String,
}

/// Records the desired database path. Moving a live `SqlitePool` to a new
/// file mid-process isn't attempted here — the value takes effect on the
/// next restart, mirroring `/server/apply-config`'s drift reporting.
pub async fn database_path(State(state): State<GatewayState>, Json(req): Json<DatabasePathRequest>) -> ApiResult<Json<Value>> {
    system_config::set(&state.services.pool, "pending_database_path", &req.path, false).await?;
    Ok(Json(serde_json::json!({ "applied": true, "restart_required": true })))
}

#[derive(Deserialize)]
pub struct BrowseQuery {
    pub path: Option<String>,
}

/// Directory listing confined to the process's workspace root — `..`
/// segments and absolute escapes are rejected before any filesystem call.
pub async fn browse_directory(Query(q): Query<BrowseQuery>) -> ApiResult<Json<Value>> {
    let root = std::env::current_dir().map_err(Error::Io)?;
    let requested = q.path.unwrap_or_default();
    let candidate = root.join(&requested);
    let resolved = candidate.canonicalize().map_err(|_| Error::Validation("invalid-path".into()))?;
    if !resolved.starts_with(&root.canonicalize().map_err(Error::Io)?) {
        return Err(Error::Validation("invalid-path".into()).into());
    }

    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(&resolved).await.map_err(Error::Io)?;
    while let Some(entry) = read_dir.next_entry().await.map_err(Error::Io)? {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        entries.push(serde_json::json!({
            "name": entry.file_name().to_string_lossy(),
            "is_dir": is_dir,
        }));
    }

    Ok(Json(serde_json::json!({ "path": resolved.to_string_lossy(), "entries": entries })))
}

#[derive(Deserialize)]
pub struct PortScanQuery {
    pub start: u16,
    #[serde(default = "default_scan_count")]
    pub count: u16,
}

fn default_scan_count() -> u16 {
    10
}

fn port_is_available(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Scans `[start, start+count)` for bindable ports, in parallel, and
/// suggests the first available one for convenience.
pub async fn scan_ports(Query(q): Query<PortScanQuery>) -> Json<Value> {
    let candidates: Vec<u16> = (q.start..q.start.saturating_add(q.count)).collect();
    let results: Vec<_> = tokio::task::spawn_blocking(move || {
        candidates
            .into_iter()
            .map(|port| (port, port_is_available(port)))
            .collect::<Vec<_>>()
    })
    .await
    .unwrap_or_default();

    let suggestion = results.iter().find(|(_, available)| *available).map(|(port, _)| *port);
    Json(serde_json::json!({
        "ports": results.into_iter().map(|(port, available)| serde_json::json!({ "port": port, "available": available })).collect::<Vec<_>>(),
        "suggested": suggestion,
    }))
}
