//! Assembles the HTTP `Router` — REST surface under `/api`, MCP JSON-RPC
//! at `/mcp`, security middleware, and (when built) the dashboard SPA.
//! Split out of `main.rs` so integration tests can drive the exact same
//! router the binary serves, via `tower::ServiceExt::oneshot`, without a
//! real TCP listener.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use hub_protocol::dispatch::Dispatcher;
use hub_protocol::transport::McpHttpState;

use crate::state::GatewayState;
use crate::{api, security};

pub async fn build(state: GatewayState) -> anyhow::Result<Router> {
    let mcp_state = Arc::new(McpHttpState {
        dispatcher: Dispatcher::new(state.services.clone()),
        pipeline: state.pipeline.clone(),
    });
    let mcp_router = Router::new().route("/mcp", post(hub_protocol::transport::handle_mcp_request)).with_state(mcp_state);

    let runtime = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await?;
    let cors_layer = security::build_cors_layer(&runtime.allowed_origins);

    let dashboard_dist = std::path::Path::new("apps/dashboard/dist");
    let api_router = if dashboard_dist.exists() {
        let index_html = dashboard_dist.join("index.html");
        let spa = ServeDir::new(dashboard_dist).not_found_service(ServeFile::new(index_html));
        api::router().nest_service("/app", spa)
    } else {
        api::router()
    };

    let governor_layer = state.config.server.rate_limit.as_ref().map(|rl| {
        use tower_governor::governor::GovernorConfigBuilder;
        use tower_governor::GovernorLayer;

        let gov_config = GovernorConfigBuilder::default()
            .per_second(rl.requests_per_second as u64)
            .burst_size(rl.burst_size)
            .finish()
            .expect("rate_limit: requests_per_second and burst_size must be > 0");
        GovernorLayer { config: Arc::new(gov_config) }
    });

    let max_concurrent = std::env::var("HUB_MAX_CONCURRENT_REQUESTS").ok().and_then(|v| v.parse::<usize>().ok()).unwrap_or(256);

    let app = Router::new()
        .nest("/api", api_router)
        .merge(mcp_router)
        .layer(axum::middleware::from_fn_with_state(state.clone(), security::setup_required_gate))
        .layer(axum::middleware::from_fn_with_state(state.clone(), security::security_headers))
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state.clone());

    let app = if let Some(gov) = governor_layer { app.layer(gov) } else { app };

    Ok(app)
}
