use chrono::{DateTime, Utc};
use hub_crypto::CipherSuite;
use hub_domain::entities::OAuthToken;
use hub_domain::Result;
use hub_store::repo::oauth_token;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Structured credential payload. Storage also accepts an opaque JSON blob,
/// which is stored in the access-token slot and round-tripped verbatim
/// (spec.md §4.4, and the Open Question at spec.md §9 about this dual
/// shape: preserved intentionally for compatibility).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Encrypts `secrets` (structured or opaque) and upserts the OAuthToken row.
pub async fn store_credential(
    pool: &SqlitePool,
    cipher: &CipherSuite,
    user_id: Uuid,
    tool_name: &str,
    provider: &str,
    secrets: &serde_json::Value,
) -> Result<()> {
    let (access_token, refresh_token, expires_at, scopes) =
        match serde_json::from_value::<CredentialPayload>(secrets.clone()) {
            Ok(payload) => (payload.access_token, payload.refresh_token, payload.expires_at, payload.scopes),
            Err(_) => (secrets.to_string(), None, None, Vec::new()),
        };

    let access_token_ciphertext = cipher.encrypt(access_token.as_bytes())?;
    let refresh_token_ciphertext = refresh_token
        .map(|t| cipher.encrypt(t.as_bytes()))
        .transpose()?;

    oauth_token::upsert(
        pool,
        &OAuthToken {
            user_id,
            tool_name: tool_name.to_string(),
            provider: provider.to_string(),
            access_token_ciphertext,
            refresh_token_ciphertext,
            expires_at,
            scopes,
        },
    )
    .await
}

/// Decrypts and returns the credential, round-tripping an opaque blob
/// verbatim if that's how it was stored.
pub async fn get_credential(
    pool: &SqlitePool,
    cipher: &CipherSuite,
    user_id: Uuid,
    tool_name: &str,
    provider: &str,
) -> Result<Option<serde_json::Value>> {
    let Some(token) = oauth_token::find(pool, user_id, tool_name, provider).await? else {
        return Ok(None);
    };
    let access_token = String::from_utf8(cipher.decrypt(&token.access_token_ciphertext)?)
        .map_err(|e| hub_domain::Error::Crypto(e.to_string()))?;

    if let Ok(opaque) = serde_json::from_str::<serde_json::Value>(&access_token) {
        if opaque.is_object() {
            return Ok(Some(opaque));
        }
    }

    let refresh_token = match token.refresh_token_ciphertext {
        Some(ct) => Some(String::from_utf8(cipher.decrypt(&ct)?).map_err(|e| hub_domain::Error::Crypto(e.to_string()))?),
        None => None,
    };

    Ok(Some(serde_json::to_value(CredentialPayload {
        access_token,
        refresh_token,
        expires_at: token.expires_at,
        scopes: token.scopes,
    })?))
}

pub async fn list_credentials(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<OAuthToken>> {
    oauth_token::list_for_user(pool, user_id).await
}

pub async fn delete_credential(pool: &SqlitePool, user_id: Uuid, tool_name: &str, provider: &str) -> Result<()> {
    oauth_token::delete(pool, user_id, tool_name, provider).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_crypto::secret;
    use hub_store::pool;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    fn cipher() -> CipherSuite {
        CipherSuite::from_salt(&secret::generate_salt()).unwrap()
    }

    #[tokio::test]
    async fn structured_credential_roundtrips() {
        let pool = memory_pool().await;
        let cipher = cipher();
        let user_id = Uuid::new_v4();
        let secrets = serde_json::json!({"access_token": "tok-123", "scopes": ["repo"]});
        store_credential(&pool, &cipher, user_id, "github", "github", &secrets).await.unwrap();
        let found = get_credential(&pool, &cipher, user_id, "github", "github").await.unwrap().unwrap();
        assert_eq!(found["access_token"], "tok-123");
    }

    #[tokio::test]
    async fn opaque_blob_roundtrips_verbatim() {
        let pool = memory_pool().await;
        let cipher = cipher();
        let user_id = Uuid::new_v4();
        let secrets = serde_json::json!({"custom_field": "whatever", "nested": {"a": 1}});
        store_credential(&pool, &cipher, user_id, "slack", "slack", &secrets).await.unwrap();
        let found = get_credential(&pool, &cipher, user_id, "slack", "slack").await.unwrap().unwrap();
        assert_eq!(found, secrets);
    }

    #[tokio::test]
    async fn delete_credential_removes_row() {
        let pool = memory_pool().await;
        let cipher = cipher();
        let user_id = Uuid::new_v4();
        store_credential(&pool, &cipher, user_id, "github", "github", &serde_json::json!({"access_token": "t"}))
            .await
            .unwrap();
        delete_credential(&pool, user_id, "github", "github").await.unwrap();
        assert!(get_credential(&pool, &cipher, user_id, "github", "github").await.unwrap().is_none());
    }
}
