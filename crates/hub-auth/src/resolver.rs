//! Concrete `hub_protocol::middleware::SessionResolver`, closing the seam
//! left open by hub-protocol so `hub-gateway` can wire the two together at
//! bootstrap without hub-protocol depending on hub-auth directly.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use hub_crypto::CipherSuite;
use hub_domain::config::WorkOsConfig;
use hub_domain::{Error, Result};
use hub_protocol::middleware::SessionResolver;
use hub_store::repo::system_config;

use crate::sso_session::{OAuth2SsoProvider, SsoSessionProvider};
use crate::{local_session, sso_session};

/// Tries both session formats in turn, mirroring `get_current_user`'s
/// wos-then-local fallback — the cookie name distinguishing the two modes
/// is stripped by the transport before the bare value reaches here, so
/// resolution is format-based rather than name-based.
pub struct HubSessionResolver {
    local_signing_secret: String,
    cipher: CipherSuite,
    pool: SqlitePool,
}

impl HubSessionResolver {
    pub fn new(local_signing_secret: String, cipher: CipherSuite, pool: SqlitePool) -> Self {
        Self { local_signing_secret, cipher, pool }
    }

    async fn workos_config(&self) -> Result<WorkOsConfig> {
        let client_id = system_config::get(&self.pool, "workos_client_id")
            .await?
            .ok_or_else(|| Error::Auth("sso session expired and workos is not configured".into()))?;
        let issuer_url = system_config::get(&self.pool, "workos_issuer_url")
            .await?
            .ok_or_else(|| Error::Auth("sso session expired and workos is not configured".into()))?;
        let redirect_uri = system_config::get(&self.pool, "workos_redirect_uri")
            .await?
            .ok_or_else(|| Error::Auth("sso session expired and workos is not configured".into()))?;
        Ok(WorkOsConfig { client_id, client_secret_env: String::new(), issuer_url, redirect_uri })
    }
}

#[async_trait]
impl SessionResolver for HubSessionResolver {
    async fn resolve(&self, token: &str) -> Result<(Uuid, Uuid)> {
        if let Ok(claims) = local_session::verify(token, &self.local_signing_secret) {
            return Ok((claims.user_id, claims.workspace_id));
        }
        if let Ok(session) = sso_session::unseal(token, &self.cipher) {
            if !session.needs_refresh(Utc::now()) {
                return Ok((session.user_id, session.workspace_id));
            }

            let client_secret = system_config::get(&self.pool, "workos_client_secret")
                .await?
                .ok_or_else(|| Error::Auth("sso session expired and workos is not configured".into()))?;
            let config = self.workos_config().await?;
            let provider = OAuth2SsoProvider { client_secret };
            provider
                .refresh(&config, &session.refresh_token)
                .await
                .map_err(|_| Error::Auth("sso session expired — refresh failed".into()))?;

            return Ok((session.user_id, session.workspace_id));
        }
        Err(Error::Auth("invalid or expired session".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use local_session::LocalSessionClaims;

    fn cipher() -> CipherSuite {
        let salt = hub_crypto::secret::generate_salt();
        CipherSuite::from_salt(&salt).unwrap()
    }

    async fn memory_pool() -> SqlitePool {
        let pool = hub_store::pool::connect("sqlite::memory:", 1).await.unwrap();
        hub_store::pool::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn resolves_a_valid_local_session() {
        let resolver = HubSessionResolver::new("secret".into(), cipher(), memory_pool().await);
        let user_id = Uuid::new_v4();
        let workspace_id = Uuid::new_v4();
        let claims = LocalSessionClaims::new(user_id, "jane@example.com".into(), workspace_id, false, Duration::days(30));
        let cookie = local_session::sign(&claims, "secret").unwrap();

        let (resolved_user, resolved_workspace) = resolver.resolve(&cookie).await.unwrap();
        assert_eq!(resolved_user, user_id);
        assert_eq!(resolved_workspace, workspace_id);
    }

    #[tokio::test]
    async fn resolves_a_valid_sso_session() {
        let cipher = cipher();
        let resolver = HubSessionResolver::new("secret".into(), cipher.clone(), memory_pool().await);
        let user_id = Uuid::new_v4();
        let workspace_id = Uuid::new_v4();
        let session = sso_session::SsoSession {
            user_id,
            workspace_id,
            email: "jane@example.com".into(),
            given_name: None,
            family_name: None,
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let sealed = sso_session::seal(&session, &cipher).unwrap();

        let (resolved_user, resolved_workspace) = resolver.resolve(&sealed).await.unwrap();
        assert_eq!(resolved_user, user_id);
        assert_eq!(resolved_workspace, workspace_id);
    }

    #[tokio::test]
    async fn expired_sso_session_attempts_refresh_instead_of_hard_logout() {
        let cipher = cipher();
        let resolver = HubSessionResolver::new("secret".into(), cipher.clone(), memory_pool().await);
        let session = sso_session::SsoSession {
            user_id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            given_name: None,
            family_name: None,
            access_token: "at".into(),
            refresh_token: "rt".into(),
            expires_at: Utc::now() - Duration::seconds(1),
        };
        let sealed = sso_session::seal(&session, &cipher).unwrap();

        // No workos_client_id/issuer_url/redirect_uri/client_secret staged in
        // system_config, so the refresh attempt fails closed rather than
        // silently trusting the expired session.
        let err = resolver.resolve(&sealed).await.unwrap_err();
        assert!(err.to_string().contains("workos is not configured"));
    }

    #[tokio::test]
    async fn rejects_garbage_tokens() {
        let resolver = HubSessionResolver::new("secret".into(), cipher(), memory_pool().await);
        assert!(resolver.resolve("not-a-real-token").await.is_err());
    }
}
