use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capability::ToolCapabilities;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SystemConfig
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One row of the process-wide key/value settings store. `value` is
/// opaque ciphertext when `is_secret` is set — plaintext never reaches
/// this struct once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub key: String,
    pub value: String,
    pub is_secret: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub owner_user_id: Uuid,
    pub external_org_id: Option<String>,
    pub settings: serde_json::Value,
}

/// Derives a unique slug from a workspace name: case-fold, non-alphanumeric
/// runs collapse to a single `-`, trimmed of leading/trailing `-`.
/// `existing` must contain every slug already in use; on collision a
/// numeric suffix (`-2`, `-3`, …) is appended until the slug is unique.
pub fn slugify_unique(name: &str, existing: &std::collections::HashSet<String>) -> String {
    let base = slugify(name);
    if !existing.contains(&base) {
        return base;
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            out.push('-');
            last_was_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// User
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    WorkspaceOwner,
    WorkspaceMember,
    WorkspaceViewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningSource {
    Local,
    WorkOs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub role: UserRole,
    pub workspace_id: Uuid,
    pub is_super_admin: bool,
    pub provisioning_source: ProvisioningSource,
    pub mfa_grace_end: DateTime<Utc>,
}

impl User {
    /// Display name used to derive a new workspace's name: `{given_name or
    /// email-prefix}'s Workspace`.
    pub fn workspace_name_hint(&self) -> String {
        let base = self
            .given_name
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.email.split('@').next().unwrap_or(&self.email).to_string());
        format!("{base}'s Workspace")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ToolRegistry / UserTool / ToolConfig
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    None,
    Key,
    OAuth,
}

/// A catalogue entry, process-wide and populated by discovery at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRegistryEntry {
    pub tool_name: String,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub auth_type: AuthType,
    pub config_schema: serde_json::Value,
    pub required_oauth: Option<String>,
    #[serde(default)]
    pub capabilities: ToolCapabilities,
}

/// Per-user activation record. Unique on (user_id, tool_name); absence
/// means "not installed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTool {
    pub user_id: Uuid,
    pub tool_name: String,
    pub enabled: bool,
}

/// One config key/value pair for a (user, tool). Values are JSON-encoded
/// strings; unique on (user_id, tool_name, config_key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    pub user_id: Uuid,
    pub tool_name: String,
    pub config_key: String,
    pub config_value: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// OAuthToken
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Stored with both token blobs already AEAD-encrypted; unique on
/// (user_id, tool_name, provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub user_id: Uuid,
    pub tool_name: String,
    pub provider: String,
    pub access_token_ciphertext: Vec<u8>,
    pub refresh_token_ciphertext: Option<Vec<u8>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AuditLog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditActor {
    pub id: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub actor_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTarget {
    #[serde(rename = "type")]
    pub target_type: String,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Append-only; rows are never mutated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub action: String,
    pub category: String,
    pub actor: AuditActor,
    pub target: AuditTarget,
    pub request_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel / Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel: String,
    pub content: serde_json::Value,
    pub sender_instance_id: String,
    pub timestamp: DateTime<Utc>,
    pub in_reply_to: Option<Uuid>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Process-global state for one logical channel name: pending queue (FIFO),
/// bounded history, live listener count, and activity timestamps. The
/// on-disk document holding all channels is the unit `fs2` locks around.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Channel {
    pub name: String,
    pub pending: std::collections::VecDeque<Message>,
    pub history: std::collections::VecDeque<Message>,
    pub listener_count: u32,
    pub last_activity: Option<DateTime<Utc>>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// TimerHandle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerHandle {
    pub id: Uuid,
    pub status: TimerStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Acme Corp!"), "acme-corp");
    }

    #[test]
    fn slugify_collapses_runs_of_punctuation() {
        assert_eq!(slugify("Foo -- Bar__Baz"), "foo-bar-baz");
    }

    #[test]
    fn slugify_unique_appends_suffix_on_collision() {
        let mut existing = std::collections::HashSet::new();
        existing.insert("acme".to_string());
        existing.insert("acme-2".to_string());
        assert_eq!(slugify_unique("Acme", &existing), "acme-3");
    }

    #[test]
    fn slugify_unique_returns_base_when_free() {
        let existing = std::collections::HashSet::new();
        assert_eq!(slugify_unique("Acme", &existing), "acme");
    }

    #[test]
    fn workspace_name_hint_prefers_given_name() {
        let user = User {
            id: Uuid::nil(),
            email: "jane@example.com".into(),
            given_name: Some("Jane".into()),
            family_name: None,
            role: UserRole::WorkspaceOwner,
            workspace_id: Uuid::nil(),
            is_super_admin: false,
            provisioning_source: ProvisioningSource::Local,
            mfa_grace_end: Utc::now(),
        };
        assert_eq!(user.workspace_name_hint(), "Jane's Workspace");
    }

    #[test]
    fn workspace_name_hint_falls_back_to_email_prefix() {
        let user = User {
            id: Uuid::nil(),
            email: "jane@example.com".into(),
            given_name: None,
            family_name: None,
            role: UserRole::WorkspaceOwner,
            workspace_id: Uuid::nil(),
            is_super_admin: false,
            provisioning_source: ProvisioningSource::Local,
            mfa_grace_end: Utc::now(),
        };
        assert_eq!(user.workspace_name_hint(), "jane's Workspace");
    }
}
