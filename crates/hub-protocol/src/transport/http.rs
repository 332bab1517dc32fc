//! The `/mcp` HTTP transport: a single endpoint accepting JSON-RPC
//! requests over a normal request/response cycle (spec.md §4.6 calls for
//! one URL handling `initialize`/list/call-style messages; true
//! server-streamed progress is out of scope here, see
//! `Dispatcher::wait_with_progress`).
//!
//! Response shape follows the teacher's `invoke_tool` convention: the HTTP
//! status is always 200 for a well-formed request, success or failure is
//! carried in the JSON-RPC envelope itself, and only a malformed request
//! body produces a non-200 status.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};

use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::middleware::Pipeline;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

pub struct McpHttpState {
    pub dispatcher: Dispatcher,
    pub pipeline: Arc<Pipeline>,
}

pub type SharedMcpHttpState = Arc<McpHttpState>;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// `POST /mcp`
pub async fn handle_mcp_request(
    State(state): State<SharedMcpHttpState>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let start = Instant::now();
    let mut ctx = RequestContext::new(request.id, bearer_token(&headers));

    let response = match state.pipeline.run(&mut ctx, &request).await {
        Ok(()) => state.dispatcher.dispatch(&ctx, &request).await,
        Err(err) => JsonRpcResponse::failure(request.id, JsonRpcError::from_hub_error(&err)),
    };

    tracing::debug!(
        request_id = request.id,
        method = %request.method,
        duration_ms = start.elapsed().as_millis() as u64,
        ok = !response.is_error(),
        "hub_protocol_http_request"
    );

    (StatusCode::OK, Json(response))
}
