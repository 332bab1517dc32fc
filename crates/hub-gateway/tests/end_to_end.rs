//! End-to-end scenarios driven through the real axum `Router` returned by
//! `hub_gateway::app::build`, via `tower::ServiceExt::oneshot` rather than a
//! bound TCP listener. Each test gets its own in-memory sqlite store.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use hub_domain::config::Config;
use hub_domain::entities::{AuthType, ProvisioningSource, ToolRegistryEntry};
use hub_auth::provisioning::{get_or_create_user_and_workspace, IdentityClaims};
use hub_gateway::state::GatewayState;
use hub_gateway::{app, auth, bootstrap};

async fn test_state() -> GatewayState {
    let mut config = Config::default();
    config.store.database_url = "sqlite::memory:".into();
    config.registry.descriptor_dirs = vec![];
    bootstrap::build(config).await.expect("bootstrap in-memory gateway")
}

async fn provision(state: &GatewayState, email: &str) -> (Uuid, Uuid, String) {
    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await.unwrap();
    let claims = IdentityClaims {
        email: email.to_string(),
        given_name: None,
        family_name: None,
        provisioning_source: ProvisioningSource::Local,
    };
    let (user, workspace) =
        get_or_create_user_and_workspace(&state.services.pool, claims, &runtime.super_admin_emails, state.config.auth.mfa_grace_days)
            .await
            .unwrap();
    let api_key = auth::generate_local_api_key();
    auth::store_local_api_key(&state.services.pool, &api_key, user.id, workspace.id).await.unwrap();
    (user.id, workspace.id, api_key)
}

fn is_local_api_key(key: &str) -> bool {
    const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
    match key.strip_prefix(auth::LOCAL_API_KEY_PREFIX) {
        Some(suffix) => suffix.len() == 43 && suffix.chars().all(|c| ALPHABET.contains(c)),
        None => false,
    }
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(v) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(v.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

#[tokio::test]
async fn first_run_local_setup_mints_key_and_reports_configured() {
    let state = test_state().await;
    let router = app::build(state.clone()).await.unwrap();

    let resp = router.clone().oneshot(request("POST", "/api/setup/local", None, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let api_key = body["api_key"].as_str().expect("api_key present");
    assert!(is_local_api_key(api_key), "unexpected key shape: {api_key}");

    let resp = router.oneshot(request("GET", "/api/setup/status", None, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let status = json_body(resp).await;
    assert_eq!(status["is_setup_required"], json!(false));
    assert_eq!(status["current_mode"], json!("local"));
    assert_eq!(status["setup_completed"], json!(true));
}

#[tokio::test]
async fn add_tool_with_missing_config_returns_400_naming_the_key() {
    let state = test_state().await;
    hub_store::repo::tool_registry::upsert(
        &state.services.pool,
        &ToolRegistryEntry {
            tool_name: "github".into(),
            display_name: "GitHub".into(),
            description: "d".into(),
            category: "dev".into(),
            auth_type: AuthType::Key,
            config_schema: json!({"required": ["api_key"]}),
            required_oauth: None,
            capabilities: Default::default(),
        },
    )
    .await
    .unwrap();
    let (_, _, api_key) = provision(&state, "member@example.com").await;
    state.mark_configured();

    let router = app::build(state).await.unwrap();
    let resp = router
        .oneshot(request("POST", "/api/user/tools/github", Some(&api_key), Some(json!({}))))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["message"].as_str().unwrap().contains("api_key"));
}

#[tokio::test]
async fn add_tool_with_valid_config_round_trips_through_get_and_dispatcher() {
    let state = test_state().await;
    hub_store::repo::tool_registry::upsert(
        &state.services.pool,
        &ToolRegistryEntry {
            tool_name: "github".into(),
            display_name: "GitHub".into(),
            description: "d".into(),
            category: "dev".into(),
            auth_type: AuthType::Key,
            config_schema: json!({"required": ["api_key"]}),
            required_oauth: None,
            capabilities: Default::default(),
        },
    )
    .await
    .unwrap();
    let (user_id, _, api_key) = provision(&state, "member@example.com").await;
    state.mark_configured();
    let pool = state.services.pool.clone();

    let router = app::build(state).await.unwrap();
    let resp = router
        .clone()
        .oneshot(request("POST", "/api/user/tools/github", Some(&api_key), Some(json!({"api_key": "secret-token"}))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router.oneshot(request("GET", "/api/user/tools/github/config", Some(&api_key), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let config = json_body(resp).await;
    assert_eq!(config["api_key"], json!("secret-token"));

    // Same row the MCP dispatcher's tool handlers read through
    // `hub_tools::catalogue::get_tool_config` before invoking a tool.
    let dispatcher_visible = hub_tools::catalogue::get_tool_config(&pool, user_id, "github").await.unwrap();
    assert_eq!(dispatcher_visible["api_key"], json!("secret-token"));
}

#[tokio::test]
async fn workspace_isolation_blocks_member_and_allows_promoted_super_admin() {
    let state = test_state().await;
    let (_, workspace_a, member_key) = provision(&state, "member@example.com").await;
    let (_, workspace_b, _) = provision(&state, "other@example.com").await;
    state.mark_configured();

    let router = app::build(state.clone()).await.unwrap();

    let resp = router.clone().oneshot(request("GET", "/api/admin/workspaces", Some(&member_key), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    hub_store::repo::system_config::set(&state.services.pool, "super_admin_emails", "member@example.com", false).await.unwrap();
    state.runtime_config.invalidate();

    let resp = router.oneshot(request("GET", "/api/admin/workspaces", Some(&member_key), None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let ids: Vec<String> = body["workspaces"].as_array().unwrap().iter().map(|w| w["id"].as_str().unwrap().to_string()).collect();
    assert!(ids.contains(&workspace_a.to_string()));
    assert!(ids.contains(&workspace_b.to_string()));
}
