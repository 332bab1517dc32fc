//! Per-request context threaded through the middleware pipeline and into
//! the dispatcher. Assembled once per inbound request by the transport
//! (stdio or HTTP), then mutated in place by each middleware stage.

use std::collections::HashMap;

use uuid::Uuid;

/// Identifies the caller and carries state middleware stages attach along
/// the way — the session-aware stage resolves `user_id`, the user-config
/// stage fills `tool_config`, and so on.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: u64,
    pub session_token: Option<String>,
    pub user_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
    /// Flattened user-scoped config, injected by `middleware::inject_user_config`
    /// so dispatch handlers don't each have to query it themselves.
    pub tool_config: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    pub fn new(request_id: u64, session_token: Option<String>) -> Self {
        Self {
            request_id,
            session_token,
            user_id: None,
            workspace_id: None,
            tool_config: HashMap::new(),
        }
    }

    /// Resolved `user_id`, or a Hub auth error if the session middleware
    /// never ran or failed to resolve one. Handlers that require a caller
    /// identity call this instead of matching on `Option` themselves.
    pub fn require_user(&self) -> hub_domain::Result<Uuid> {
        self.user_id
            .ok_or_else(|| hub_domain::Error::Auth("no authenticated session on this request".into()))
    }

    pub fn require_workspace(&self) -> hub_domain::Result<Uuid> {
        self.workspace_id
            .ok_or_else(|| hub_domain::Error::Auth("no workspace resolved on this request".into()))
    }
}
