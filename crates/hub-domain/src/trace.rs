use serde::Serialize;

/// Structured trace events emitted across all Hub crates, folded into the
/// `tracing` span as a single `trace_event` field so the JSON log sink
/// carries a stable, parseable shape regardless of the emitting crate.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    BootstrapTransition {
        from: String,
        to: String,
    },
    UserAuthenticated {
        user_id: String,
        mode: String,
    },
    WorkspaceProvisioned {
        workspace_id: String,
        slug: String,
    },
    ToolActivated {
        user_id: String,
        tool_name: String,
    },
    ToolInvoked {
        user_id: String,
        tool_name: String,
        call_id: String,
        duration_ms: u64,
        ok: bool,
    },
    InstanceStateChanged {
        user_id: String,
        tool_name: String,
        from: String,
        to: String,
    },
    ChannelMessageSent {
        channel: String,
        sender: String,
        message_id: String,
    },
    ChannelListenerAttached {
        channel: String,
        listener: String,
    },
    TimerStarted {
        timer_id: String,
        duration_ms: u64,
    },
    TimerCompleted {
        timer_id: String,
        reason: String,
    },
    AuditRecorded {
        category: String,
        actor: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "hub_event");
    }
}
