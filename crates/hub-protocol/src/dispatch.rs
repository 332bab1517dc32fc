//! Method-name dispatch: the Hub-side analogue of the teacher's
//! `ToolRouter::resolve` + `invoke_tool` handler, but routing JSON-RPC
//! `method` strings onto the fixed call-tool surface from spec.md §6
//! instead of resolving a dynamic node destination.
//!
//! A plain `match` on `method` is used rather than a `HashMap<String, Box<dyn
//! Handler>>` registry: the operation set is closed and named explicitly by
//! the specification, not user-extensible, so a registry would only add
//! indirection.

use std::sync::Arc;
use std::time::Duration;

use hub_audit::Auditor;
use hub_channels::{ChannelHub, ListenOutcome};
use hub_crypto::CipherSuite;
use hub_domain::entities::AuditActor;
use hub_domain::{Error, Result};
use hub_instances::SharedInstanceManager;
use hub_registry::Registry;
use hub_timers::{SharedTimerManager, TimerManager};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::protocol::{methods, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Everything a method handler might need. Cheap to clone — every field is
/// either a pool (internally pooled) or an `Arc`.
#[derive(Clone)]
pub struct HubServices {
    pub pool: SqlitePool,
    pub cipher: CipherSuite,
    pub channels: Arc<ChannelHub>,
    pub timers: SharedTimerManager,
    pub instances: SharedInstanceManager,
    pub registry: Arc<Registry>,
    pub auditor: Auditor,
}

fn audit_ctx(ctx: &RequestContext) -> hub_audit::RequestContext {
    hub_audit::RequestContext {
        request_id: Some(ctx.request_id.to_string()),
        ip: None,
        user_agent: None,
    }
}

fn audit_actor(user_id: Uuid) -> AuditActor {
    AuditActor {
        id: Some(user_id.to_string()),
        email: None,
        actor_type: "user".into(),
    }
}

pub struct Dispatcher {
    services: HubServices,
}

impl Dispatcher {
    pub fn new(services: HubServices) -> Self {
        Self { services }
    }

    /// Runs one request to completion and always returns a well-formed
    /// response — errors are encoded in the JSON-RPC error object, never
    /// propagated to the caller as a transport-level failure.
    pub async fn dispatch(&self, ctx: &RequestContext, req: &JsonRpcRequest) -> JsonRpcResponse {
        match self.handle(ctx, req).await {
            Ok(result) => JsonRpcResponse::success(req.id, result),
            Err(err) => JsonRpcResponse::failure(req.id, JsonRpcError::from_hub_error(&err)),
        }
    }

    async fn handle(&self, ctx: &RequestContext, req: &JsonRpcRequest) -> Result<Value> {
        let params = req.params.clone().unwrap_or(Value::Null);

        match req.method.as_str() {
            methods::GET_AVAILABLE_TOOLS => self.get_available_tools(ctx).await,
            methods::GET_TOOL_METADATA => self.get_tool_metadata(&params).await,
            methods::ADD_TOOL => self.add_tool(ctx, &params).await,
            methods::REMOVE_TOOL => self.remove_tool(ctx, &params).await,
            methods::LIST_MY_TOOLS => self.list_my_tools(ctx).await,
            methods::GET_TOOL_CONFIG => self.get_tool_config(ctx, &params).await,
            methods::UPDATE_TOOL_CONFIG => self.update_tool_config(ctx, &params).await,
            methods::GET_MISSING_CONFIG => self.get_missing_config(ctx, &params).await,

            methods::STORE_CREDENTIAL => self.store_credential(ctx, &params).await,
            methods::GET_CREDENTIAL => self.get_credential(ctx, &params).await,
            methods::LIST_CREDENTIALS => self.list_credentials(ctx).await,
            methods::DELETE_CREDENTIAL => self.delete_credential(ctx, &params).await,

            methods::LISTEN_FOR_MESSAGE => self.listen_for_message(ctx, &params).await,
            methods::SEND_MESSAGE => self.send_message(ctx, &params).await,
            methods::SEND_REPLY => self.send_reply(ctx, &params).await,
            methods::GET_CHANNEL_HISTORY => self.get_channel_history(&params).await,
            methods::CLEAR_CHANNEL => self.clear_channel(&params).await,
            methods::LIST_ACTIVE_CHANNELS => self.list_active_channels().await,

            methods::START_TIMER => self.start_timer(&params).await,
            methods::GET_TIMER_STATUS => self.get_timer_status(&params).await,
            methods::CANCEL_TIMER => self.cancel_timer(&params).await,
            methods::LIST_ACTIVE_TIMERS => self.list_active_timers().await,
            methods::CLEANUP_TIMERS => self.cleanup_timers().await,
            methods::WAIT_SECONDS => self.wait_seconds(&params).await,
            methods::WAIT_MINUTES => self.wait_minutes(&params).await,
            methods::WAIT_UNTIL_TIMESTAMP => self.wait_until_timestamp(&params).await,
            methods::WAIT_WITH_PROGRESS => self.wait_with_progress(&params).await,

            other => Err(Error::NotFound(format!("method {other}"))),
        }
    }

    // ── tool catalogue ──────────────────────────────────────────────

    async fn get_available_tools(&self, ctx: &RequestContext) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let catalogue = hub_tools::catalogue::get_catalogue(&self.services.pool, user_id).await?;
        Ok(json!(catalogue))
    }

    async fn get_tool_metadata(&self, params: &Value) -> Result<Value> {
        let tool_name = require_str(params, "tool_name")?;
        let descriptor = hub_tools::catalogue::get_tool_metadata(&self.services.pool, tool_name).await?;
        Ok(json!(descriptor))
    }

    async fn add_tool(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let config = params.get("config").cloned().unwrap_or_else(|| json!({}));
        let result = hub_tools::catalogue::add_tool(&self.services.pool, user_id, tool_name, &config).await;
        self.audit_tool_mutation("tool.added", ctx, user_id, tool_name, result.is_ok(), result.as_ref().err())
            .await;
        result?;
        Ok(Value::Null)
    }

    async fn remove_tool(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let result = hub_tools::catalogue::remove_tool(&self.services.pool, user_id, tool_name).await;
        self.audit_tool_mutation("tool.removed", ctx, user_id, tool_name, result.is_ok(), result.as_ref().err())
            .await;
        result?;
        Ok(Value::Null)
    }

    /// Audit logging is best-effort: a failure to write the audit row must
    /// never mask the tool operation's own result, so errors here are only
    /// logged, never propagated.
    async fn audit_tool_mutation(&self, action: &str, ctx: &RequestContext, user_id: Uuid, tool_name: &str, success: bool, error: Option<&Error>) {
        let Some(workspace_id) = ctx.workspace_id else {
            return;
        };
        if let Err(err) = self
            .services
            .auditor
            .log_tool(action, workspace_id, audit_actor(user_id), tool_name, &audit_ctx(ctx), success, error.map(|e| e.to_string()))
            .await
        {
            tracing::warn!(%err, action, "failed to write audit log entry");
        }
    }

    async fn list_my_tools(&self, ctx: &RequestContext) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let catalogue = hub_tools::catalogue::get_catalogue(&self.services.pool, user_id).await?;
        let installed: Vec<_> = catalogue
            .into_iter()
            .filter(|entry| entry.status != hub_tools::ToolStatus::NotInstalled)
            .collect();
        Ok(json!(installed))
    }

    async fn get_tool_config(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        hub_tools::catalogue::get_tool_config(&self.services.pool, user_id, tool_name).await
    }

    async fn update_tool_config(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let partial = params.get("config").cloned().unwrap_or_else(|| json!({}));
        hub_tools::catalogue::update_tool_config(&self.services.pool, user_id, tool_name, &partial).await?;
        Ok(Value::Null)
    }

    async fn get_missing_config(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let missing = hub_tools::catalogue::get_missing_config(&self.services.pool, user_id, tool_name).await?;
        Ok(json!(missing))
    }

    // ── credentials ──────────────────────────────────────────────────

    async fn store_credential(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let provider = params.get("provider").and_then(|v| v.as_str()).unwrap_or(tool_name);
        let secrets = params
            .get("secrets")
            .cloned()
            .ok_or_else(|| Error::Validation("missing \"secrets\"".into()))?;
        let result =
            hub_tools::credential::store_credential(&self.services.pool, &self.services.cipher, user_id, tool_name, provider, &secrets)
                .await;
        self.audit_credential_mutation("credential.stored", ctx, user_id, tool_name, provider, result.is_ok())
            .await;
        result?;
        Ok(Value::Null)
    }

    async fn audit_credential_mutation(&self, action: &str, ctx: &RequestContext, user_id: Uuid, tool_name: &str, provider: &str, success: bool) {
        let Some(workspace_id) = ctx.workspace_id else {
            return;
        };
        if let Err(err) = self
            .services
            .auditor
            .log_credential(action, workspace_id, audit_actor(user_id), tool_name, provider, &audit_ctx(ctx), success)
            .await
        {
            tracing::warn!(%err, action, "failed to write audit log entry");
        }
    }

    async fn get_credential(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let provider = params.get("provider").and_then(|v| v.as_str()).unwrap_or(tool_name);
        let found = hub_tools::credential::get_credential(&self.services.pool, &self.services.cipher, user_id, tool_name, provider).await?;
        found.ok_or_else(|| Error::NotFound(format!("credential for {tool_name}/{provider}")))
    }

    async fn list_credentials(&self, ctx: &RequestContext) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let creds = hub_tools::credential::list_credentials(&self.services.pool, user_id).await?;
        // Ciphertext blobs never leave the process — list only what a
        // caller needs to tell credentials apart.
        let summaries: Vec<_> = creds
            .into_iter()
            .map(|c| json!({ "tool_name": c.tool_name, "provider": c.provider, "scopes": c.scopes, "expires_at": c.expires_at }))
            .collect();
        Ok(json!(summaries))
    }

    async fn delete_credential(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let user_id = ctx.require_user()?;
        let tool_name = require_str(params, "tool_name")?;
        let provider = params.get("provider").and_then(|v| v.as_str()).unwrap_or(tool_name);
        let result = hub_tools::credential::delete_credential(&self.services.pool, user_id, tool_name, provider).await;
        self.audit_credential_mutation("credential.deleted", ctx, user_id, tool_name, provider, result.is_ok())
            .await;
        result?;
        Ok(Value::Null)
    }

    // ── channels ─────────────────────────────────────────────────────

    async fn listen_for_message(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let channel = require_str(params, "channel")?;
        let timeout_secs = params.get("timeout_seconds").and_then(|v| v.as_u64()).unwrap_or(30);
        let outcome = self.services.channels.listen(channel, Duration::from_secs(timeout_secs)).await?;
        let _ = ctx;
        Ok(match outcome {
            ListenOutcome::Message(message) => json!({ "message": message }),
            ListenOutcome::Timeout => json!({ "message": null, "timed_out": true }),
        })
    }

    async fn send_message(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let channel = require_str(params, "channel")?;
        let content = params.get("content").cloned().unwrap_or(Value::Null);
        let metadata = params.get("metadata").cloned().unwrap_or_else(|| json!({}));
        let sender_id = sender_instance_id(ctx, params);
        let wait_for_reply = params.get("wait_for_reply").and_then(|v| v.as_bool()).unwrap_or(false);

        if wait_for_reply {
            let reply_timeout_secs = params.get("reply_timeout").and_then(|v| v.as_f64()).unwrap_or(30.0);
            let outcome = self
                .services
                .channels
                .send_with_reply(channel, content, metadata, &sender_id, Duration::from_secs_f64(reply_timeout_secs))
                .await?;
            return Ok(match outcome {
                ListenOutcome::Message(reply) => json!({ "reply_status": "received", "reply": reply }),
                ListenOutcome::Timeout => json!({ "reply_status": "timeout", "reply": null }),
            });
        }

        let message = self.services.channels.send(channel, content, metadata, &sender_id)?;
        Ok(json!(message))
    }

    async fn send_reply(&self, ctx: &RequestContext, params: &Value) -> Result<Value> {
        let original_message_id = require_str(params, "original_message_id")?;
        let original_message_id = Uuid::parse_str(original_message_id)
            .map_err(|e| Error::Validation(format!("invalid original_message_id: {e}")))?;
        let reply_channel = require_str(params, "reply_channel")?;
        let content = params.get("content").cloned().unwrap_or(Value::Null);
        let sender_id = sender_instance_id(ctx, params);
        let message = self
            .services
            .channels
            .send_reply(original_message_id, reply_channel, content, &sender_id)?;
        Ok(json!(message))
    }

    async fn get_channel_history(&self, params: &Value) -> Result<Value> {
        let channel = require_str(params, "channel")?;
        let limit = params.get("limit").and_then(|v| v.as_u64()).unwrap_or(50) as usize;
        let history = self.services.channels.history(channel, limit)?;
        Ok(json!(history))
    }

    async fn clear_channel(&self, params: &Value) -> Result<Value> {
        let channel = require_str(params, "channel")?;
        self.services.channels.clear(channel)?;
        Ok(Value::Null)
    }

    async fn list_active_channels(&self) -> Result<Value> {
        Ok(json!(self.services.channels.active_channels()?))
    }

    // ── timers ───────────────────────────────────────────────────────

    async fn start_timer(&self, params: &Value) -> Result<Value> {
        let duration_ms = params
            .get("duration_ms")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::Validation("missing \"duration_ms\"".into()))?;
        let interval_ms = params.get("interval_ms").and_then(|v| v.as_u64()).unwrap_or(1000);
        let id = Arc::clone(&self.services.timers).start_timer(Duration::from_millis(duration_ms), Duration::from_millis(interval_ms))?;
        Ok(json!({ "timer_id": id }))
    }

    async fn get_timer_status(&self, params: &Value) -> Result<Value> {
        let id = require_uuid(params, "timer_id")?;
        let handle = self.services.timers.get(id).ok_or_else(|| Error::NotFound(format!("timer {id}")))?;
        Ok(json!(handle))
    }

    async fn cancel_timer(&self, params: &Value) -> Result<Value> {
        let id = require_uuid(params, "timer_id")?;
        self.services.timers.cancel_timer(id)?;
        Ok(Value::Null)
    }

    async fn list_active_timers(&self) -> Result<Value> {
        Ok(json!(self.services.timers.list_active_timers()))
    }

    async fn cleanup_timers(&self) -> Result<Value> {
        Ok(json!({ "removed": self.services.timers.cleanup_timers() }))
    }

    /// The `wait` tool's three convenience entry points and its
    /// progress-reporting variant all reduce to "start a timer, then block
    /// the caller until it reaches a terminal state" — this is a
    /// synchronous tool call, unlike `start_timer`'s fire-and-forget.
    async fn wait_seconds(&self, params: &Value) -> Result<Value> {
        let secs = params.get("seconds").and_then(|v| v.as_u64()).ok_or_else(|| Error::Validation("missing \"seconds\"".into()))?;
        self.block_until_timer_finishes(Duration::from_secs(secs)).await
    }

    async fn wait_minutes(&self, params: &Value) -> Result<Value> {
        let minutes = params.get("minutes").and_then(|v| v.as_u64()).ok_or_else(|| Error::Validation("missing \"minutes\"".into()))?;
        self.block_until_timer_finishes(Duration::from_secs(minutes * 60)).await
    }

    async fn wait_until_timestamp(&self, params: &Value) -> Result<Value> {
        let target = params
            .get("timestamp")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("missing \"timestamp\"".into()))?;
        let target = chrono::DateTime::parse_from_rfc3339(target)
            .map_err(|e| Error::Validation(format!("invalid timestamp: {e}")))?
            .with_timezone(&chrono::Utc);
        let now = chrono::Utc::now();
        let duration = (target - now).to_std().unwrap_or(Duration::ZERO);
        self.block_until_timer_finishes(duration).await
    }

    /// Identical to `wait_seconds` at the protocol boundary — true
    /// incremental progress notifications would need a streaming
    /// transport, which the request/response JSON-RPC surface doesn't
    /// provide here. The caller can still poll `get_timer_status` with the
    /// returned `timer_id` while this call is in flight on another
    /// connection.
    async fn wait_with_progress(&self, params: &Value) -> Result<Value> {
        let secs = params.get("seconds").and_then(|v| v.as_u64()).ok_or_else(|| Error::Validation("missing \"seconds\"".into()))?;
        self.block_until_timer_finishes(Duration::from_secs(secs)).await
    }

    async fn block_until_timer_finishes(&self, duration: Duration) -> Result<Value> {
        let interval = Duration::from_millis(250).min(duration.max(Duration::from_millis(1)));
        let id = Arc::clone(&self.services.timers).start_timer(duration, interval)?;
        loop {
            if let Some(handle) = self.services.timers.get(id) {
                if handle.status != hub_domain::entities::TimerStatus::Running {
                    return Ok(json!(handle));
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

fn require_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Validation(format!("missing \"{key}\"")))
}

fn require_uuid(params: &Value, key: &str) -> Result<Uuid> {
    let raw = require_str(params, key)?;
    Uuid::parse_str(raw).map_err(|e| Error::Validation(format!("invalid {key}: {e}")))
}

fn sender_instance_id(ctx: &RequestContext, params: &Value) -> String {
    params
        .get("sender_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| ctx.user_id.map(|id| id.to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}
