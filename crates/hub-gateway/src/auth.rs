//! REST-layer caller resolution: identity from session cookie or bearer
//! fallback.
//!
//! `hub_auth::HubSessionResolver` already accepts either session format
//! regardless of which cookie carried it, so the cookie-vs-bearer split
//! collapses to "find an opaque token, hand it to the resolver" — except
//! for the long-lived `omni_local_*` API key minted by the local setup
//! wizard, which is a flat secret rather than a signed/sealed session and
//! is checked first.

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use hub_domain::entities::User;
use hub_domain::{Error, Result};
use hmac::{Hmac, Mac};
use hub_protocol::middleware::SessionResolver;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use hub_store::repo::{system_config, user};

use crate::state::GatewayState;

pub const LOCAL_API_KEY_PREFIX: &str = "omni_local_";
const LOCAL_API_KEY_RANDOM_CHARS: usize = 43;

/// The resolved caller: the user row plus the workspace the session (or
/// API key) carries. Kept separate from `User::workspace_id` in case a
/// future super-admin "act as workspace" flow needs them to diverge.
pub struct Caller {
    pub user: User,
    pub workspace_id: Uuid,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn session_cookie(jar: &CookieJar) -> Option<String> {
    jar.get("local_session")
        .or_else(|| jar.get("wos_session"))
        .map(|c| c.value().to_string())
}

fn hash_api_key(key: &str) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac = HmacSha256::new_from_slice(b"hub-gateway-local-api-key").expect("static key");
    mac.update(key.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Generates a fresh `omni_local_[A-Za-z0-9_-]{43}` API key for the
/// first-run local setup flow.
pub fn generate_local_api_key() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..LOCAL_API_KEY_RANDOM_CHARS)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{LOCAL_API_KEY_PREFIX}{suffix}")
}

/// Persists the API key's hash and the (user, workspace) it authenticates
/// as, so `resolve_local_api_key` can verify it later without storing the
/// key itself.
pub async fn store_local_api_key(
    pool: &sqlx::SqlitePool,
    key: &str,
    user_id: Uuid,
    workspace_id: Uuid,
) -> Result<()> {
    system_config::set(pool, "local_api_key_hash", &hash_api_key(key), true).await?;
    system_config::set(pool, "local_api_key_user_id", &user_id.to_string(), false).await?;
    system_config::set(pool, "local_api_key_workspace_id", &workspace_id.to_string(), false).await?;
    Ok(())
}

async fn resolve_local_api_key(pool: &sqlx::SqlitePool, token: &str) -> Result<Option<(Uuid, Uuid)>> {
    if !token.starts_with(LOCAL_API_KEY_PREFIX) {
        return Ok(None);
    }
    let Some(stored_hash) = system_config::get(pool, "local_api_key_hash").await? else {
        return Ok(None);
    };
    let candidate_hash = hash_api_key(token);
    if candidate_hash.as_bytes().ct_eq(stored_hash.as_bytes()).unwrap_u8() != 1 {
        return Ok(None);
    }
    let user_id = system_config::get(pool, "local_api_key_user_id")
        .await?
        .and_then(|s| Uuid::parse_str(&s).ok());
    let workspace_id = system_config::get(pool, "local_api_key_workspace_id")
        .await?
        .and_then(|s| Uuid::parse_str(&s).ok());
    match (user_id, workspace_id) {
        (Some(u), Some(w)) => Ok(Some((u, w))),
        _ => Ok(None),
    }
}

/// Resolves the caller from the request's session cookie or `Authorization`
/// bearer header, in that order of preference, loading the full `User` row
/// so handlers can apply role-based authorization.
pub async fn resolve_caller(state: &GatewayState, headers: &HeaderMap, jar: &CookieJar) -> Result<Caller> {
    let token = session_cookie(jar).or_else(|| bearer_token(headers));
    let Some(token) = token else {
        return Err(Error::Auth("missing session cookie or bearer token".into()));
    };

    let (user_id, workspace_id) = match resolve_local_api_key(&state.services.pool, &token).await? {
        Some(pair) => pair,
        None => state.resolver.resolve(&token).await.map_err(|_| Error::Auth("invalid or expired session".into()))?,
    };

    let found = user::find_by_id(&state.services.pool, user_id).await?;
    let user_row = found.ok_or_else(|| Error::Auth("session user no longer exists".into()))?;
    Ok(Caller { user: user_row, workspace_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_store::pool;

    #[test]
    fn generated_key_has_expected_shape() {
        let key = generate_local_api_key();
        assert!(key.starts_with(LOCAL_API_KEY_PREFIX));
        assert_eq!(key.len(), LOCAL_API_KEY_PREFIX.len() + LOCAL_API_KEY_RANDOM_CHARS);
    }

    #[test]
    fn generated_keys_are_distinct() {
        assert_ne!(generate_local_api_key(), generate_local_api_key());
    }

    #[test]
    fn hash_is_deterministic_and_key_specific() {
        let key = generate_local_api_key();
        assert_eq!(hash_api_key(&key), hash_api_key(&key));
        assert_ne!(hash_api_key(&key), hash_api_key(&generate_local_api_key()));
    }

    #[tokio::test]
    async fn resolve_local_api_key_round_trips() {
        let db = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&db).await.unwrap();

        let key = generate_local_api_key();
        let user_id = Uuid::new_v4();
        let workspace_id = Uuid::new_v4();
        store_local_api_key(&db, &key, user_id, workspace_id).await.unwrap();

        let resolved = resolve_local_api_key(&db, &key).await.unwrap();
        assert_eq!(resolved, Some((user_id, workspace_id)));
    }

    #[tokio::test]
    async fn resolve_local_api_key_rejects_wrong_key() {
        let db = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&db).await.unwrap();

        store_local_api_key(&db, &generate_local_api_key(), Uuid::new_v4(), Uuid::new_v4()).await.unwrap();

        let resolved = resolve_local_api_key(&db, &generate_local_api_key()).await.unwrap();
        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn resolve_local_api_key_ignores_non_local_tokens() {
        let db = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&db).await.unwrap();

        let resolved = resolve_local_api_key(&db, "not_a_local_key").await.unwrap();
        assert_eq!(resolved, None);
    }
}
