use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Authentication & session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Gates which session validator runs. Set once via the setup wizard and
/// persisted to `SystemConfig`; `Unconfigured` is only observed between
/// bootstrap and the wizard's completion POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    #[default]
    Unconfigured,
    Local,
    WorkOs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub app_mode: AppMode,
    /// Case-insensitive, trimmed at comparison time (§4.2 super-admin policy).
    #[serde(default)]
    pub super_admin_emails: Vec<String>,
    /// `local_session` cookie lifetime.
    #[serde(default = "d_local_session_days")]
    pub local_session_days: i64,
    /// Grace period before an unenrolled account is locked out pending MFA.
    #[serde(default = "d_mfa_grace_days")]
    pub mfa_grace_days: i64,
    #[serde(default)]
    pub workos: Option<WorkOsConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            app_mode: AppMode::default(),
            super_admin_emails: Vec::new(),
            local_session_days: d_local_session_days(),
            mfa_grace_days: d_mfa_grace_days(),
            workos: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOsConfig {
    pub client_id: String,
    pub client_secret_env: String,
    pub issuer_url: String,
    pub redirect_uri: String,
}

fn d_local_session_days() -> i64 {
    30
}
fn d_mfa_grace_days() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_app_mode_is_unconfigured() {
        assert_eq!(AuthConfig::default().app_mode, AppMode::Unconfigured);
    }

    #[test]
    fn default_session_lifetime_is_30_days() {
        assert_eq!(AuthConfig::default().local_session_days, 30);
    }

    #[test]
    fn default_mfa_grace_is_7_days() {
        assert_eq!(AuthConfig::default().mfa_grace_days, 7);
    }
}
