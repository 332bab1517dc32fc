//! Ordered middleware chain run before a request reaches the dispatcher
//! (spec.md §4.6: session-aware, then user-config injection, then request
//! logging, with reserved hooks for rate-limiting and access control).
//!
//! Modeled on the teacher's `axum::middleware::from_fn_with_state` chaining
//! in `sa_gateway::api::mod::router`, generalized to a transport-agnostic
//! `Vec` of stages so the same chain runs under both the stdio and HTTP
//! transports instead of two separate axum layer stacks. Stage traits use
//! `#[async_trait]`, the same way the teacher's `McpTransport` trait does.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::context::RequestContext;
use crate::protocol::JsonRpcRequest;

/// One pipeline stage. Takes the in-flight context and the inbound request,
/// may mutate the context, and can short-circuit with an error (e.g. an
/// invalid session token).
#[async_trait]
pub trait MiddlewareStage: Send + Sync {
    async fn run(&self, ctx: &mut RequestContext, req: &JsonRpcRequest) -> hub_domain::Result<()>;
}

/// Resolves `session_token` to a `user_id`/`workspace_id` pair via
/// `hub-auth`'s session store. Left as a pluggable trait object here so
/// `hub-protocol` doesn't depend on `hub-auth` directly — `hub-gateway`
/// wires the concrete implementation in at bootstrap.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> hub_domain::Result<(uuid::Uuid, uuid::Uuid)>;
}

pub struct SessionAwareStage {
    pub resolver: Arc<dyn SessionResolver>,
}

#[async_trait]
impl MiddlewareStage for SessionAwareStage {
    async fn run(&self, ctx: &mut RequestContext, _req: &JsonRpcRequest) -> hub_domain::Result<()> {
        let Some(token) = ctx.session_token.clone() else {
            return Err(hub_domain::Error::Auth("missing session token".into()));
        };
        let (user_id, workspace_id) = self.resolver.resolve(&token).await?;
        ctx.user_id = Some(user_id);
        ctx.workspace_id = Some(workspace_id);
        Ok(())
    }
}

/// Flattens the caller's persisted per-tool config into `ctx.tool_config`
/// so dispatch handlers read it off the context instead of each issuing
/// their own store query — mirrors `get_catalogue`'s per-user annotation
/// pass but runs once per request rather than once per tool.
pub struct UserConfigStage {
    pub pool: SqlitePool,
}

#[async_trait]
impl MiddlewareStage for UserConfigStage {
    async fn run(&self, ctx: &mut RequestContext, req: &JsonRpcRequest) -> hub_domain::Result<()> {
        let Some(user_id) = ctx.user_id else {
            return Ok(());
        };
        let Some(tool_name) = req.params.as_ref().and_then(|p| p.get("tool_name")).and_then(|v| v.as_str()) else {
            return Ok(());
        };
        let config = hub_tools::catalogue::get_tool_config(&self.pool, user_id, tool_name).await?;
        if let Some(obj) = config.as_object() {
            ctx.tool_config = obj.clone().into_iter().collect();
        }
        Ok(())
    }
}

/// Logs method, request id, and resolved caller at the point the request
/// is about to reach the dispatcher.
pub struct RequestLoggingStage;

#[async_trait]
impl MiddlewareStage for RequestLoggingStage {
    async fn run(&self, ctx: &mut RequestContext, req: &JsonRpcRequest) -> hub_domain::Result<()> {
        tracing::info!(
            request_id = ctx.request_id,
            method = %req.method,
            user_id = ?ctx.user_id,
            "hub_protocol_request"
        );
        Ok(())
    }
}

/// Ordered chain of stages run in sequence; stops at the first error.
/// Reserved slots for rate-limiting and access-control hooks are simply
/// additional stages appended to `stages` — nothing in the pipeline shape
/// needs to change to add them.
pub struct Pipeline {
    stages: Vec<Box<dyn MiddlewareStage>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn MiddlewareStage>>) -> Self {
        Self { stages }
    }

    pub async fn run(&self, ctx: &mut RequestContext, req: &JsonRpcRequest) -> hub_domain::Result<()> {
        for stage in &self.stages {
            stage.run(ctx, req).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct FixedResolver {
        user_id: Uuid,
        workspace_id: Uuid,
    }

    #[async_trait]
    impl SessionResolver for FixedResolver {
        async fn resolve(&self, _token: &str) -> hub_domain::Result<(Uuid, Uuid)> {
            Ok((self.user_id, self.workspace_id))
        }
    }

    #[tokio::test]
    async fn session_aware_stage_populates_user_and_workspace() {
        let user_id = Uuid::new_v4();
        let workspace_id = Uuid::new_v4();
        let pipeline = Pipeline::new(vec![Box::new(SessionAwareStage {
            resolver: Arc::new(FixedResolver { user_id, workspace_id }),
        })]);
        let mut ctx = RequestContext::new(1, Some("tok".into()));
        let req = JsonRpcRequest::new(1, "list_my_tools", None);
        pipeline.run(&mut ctx, &req).await.unwrap();
        assert_eq!(ctx.user_id, Some(user_id));
        assert_eq!(ctx.workspace_id, Some(workspace_id));
    }

    #[tokio::test]
    async fn session_aware_stage_rejects_a_missing_token() {
        let pipeline = Pipeline::new(vec![Box::new(SessionAwareStage {
            resolver: Arc::new(FixedResolver {
                user_id: Uuid::new_v4(),
                workspace_id: Uuid::new_v4(),
            }),
        })]);
        let mut ctx = RequestContext::new(1, None);
        let req = JsonRpcRequest::new(1, "list_my_tools", None);
        assert!(pipeline.run(&mut ctx, &req).await.is_err());
    }

    #[tokio::test]
    async fn request_logging_stage_never_fails() {
        let pipeline = Pipeline::new(vec![Box::new(RequestLoggingStage)]);
        let mut ctx = RequestContext::new(1, None);
        let req = JsonRpcRequest::new(1, "list_my_tools", None);
        assert!(pipeline.run(&mut ctx, &req).await.is_ok());
    }
}
