use chrono::{DateTime, Utc};
use hub_domain::entities::OAuthToken;
use hub_domain::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct OAuthTokenRow {
    user_id: String,
    tool_name: String,
    provider: String,
    access_token_ciphertext: Vec<u8>,
    refresh_token_ciphertext: Option<Vec<u8>>,
    expires_at: Option<String>,
    scopes: String,
}

impl TryFrom<OAuthTokenRow> for OAuthToken {
    type Error = Error;

    fn try_from(row: OAuthTokenRow) -> Result<Self> {
        let expires_at = row
            .expires_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| Error::Store(e.to_string()))
            })
            .transpose()?;
        Ok(OAuthToken {
            user_id: Uuid::parse_str(&row.user_id).map_err(|e| Error::Store(e.to_string()))?,
            tool_name: row.tool_name,
            provider: row.provider,
            access_token_ciphertext: row.access_token_ciphertext,
            refresh_token_ciphertext: row.refresh_token_ciphertext,
            expires_at,
            scopes: serde_json::from_str(&row.scopes).unwrap_or_default(),
        })
    }
}

/// Ciphertext blobs must already be AEAD-sealed by the caller — this
/// module never sees plaintext credentials.
pub async fn upsert(pool: &SqlitePool, token: &OAuthToken) -> Result<()> {
    sqlx::query(
        "INSERT INTO oauth_token
            (user_id, tool_name, provider, access_token_ciphertext, refresh_token_ciphertext, expires_at, scopes)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(user_id, tool_name, provider) DO UPDATE SET
            access_token_ciphertext = excluded.access_token_ciphertext,
            refresh_token_ciphertext = excluded.refresh_token_ciphertext,
            expires_at = excluded.expires_at,
            scopes = excluded.scopes",
    )
    .bind(token.user_id.to_string())
    .bind(&token.tool_name)
    .bind(&token.provider)
    .bind(&token.access_token_ciphertext)
    .bind(&token.refresh_token_ciphertext)
    .bind(token.expires_at.map(|dt| dt.to_rfc3339()))
    .bind(serde_json::to_string(&token.scopes).unwrap_or_else(|_| "[]".into()))
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn find(pool: &SqlitePool, user_id: Uuid, tool_name: &str, provider: &str) -> Result<Option<OAuthToken>> {
    let row: Option<OAuthTokenRow> = sqlx::query_as(
        "SELECT user_id, tool_name, provider, access_token_ciphertext, refresh_token_ciphertext, expires_at, scopes
         FROM oauth_token WHERE user_id = ? AND tool_name = ? AND provider = ?",
    )
    .bind(user_id.to_string())
    .bind(tool_name)
    .bind(provider)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    row.map(OAuthToken::try_from).transpose()
}

pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<OAuthToken>> {
    let rows: Vec<OAuthTokenRow> = sqlx::query_as(
        "SELECT user_id, tool_name, provider, access_token_ciphertext, refresh_token_ciphertext, expires_at, scopes
         FROM oauth_token WHERE user_id = ?",
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(OAuthToken::try_from).collect()
}

pub async fn delete(pool: &SqlitePool, user_id: Uuid, tool_name: &str, provider: &str) -> Result<()> {
    sqlx::query("DELETE FROM oauth_token WHERE user_id = ? AND tool_name = ? AND provider = ?")
        .bind(user_id.to_string())
        .bind(tool_name)
        .bind(provider)
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    fn sample(user_id: Uuid) -> OAuthToken {
        OAuthToken {
            user_id,
            tool_name: "github".into(),
            provider: "github".into(),
            access_token_ciphertext: vec![1, 2, 3],
            refresh_token_ciphertext: Some(vec![4, 5, 6]),
            expires_at: Some(Utc::now()),
            scopes: vec!["repo".into(), "read:org".into()],
        }
    }

    #[tokio::test]
    async fn upsert_then_find_roundtrips_ciphertext() {
        let pool = memory_pool().await;
        let user_id = Uuid::new_v4();
        let token = sample(user_id);
        upsert(&pool, &token).await.unwrap();
        let found = find(&pool, user_id, "github", "github").await.unwrap().unwrap();
        assert_eq!(found.access_token_ciphertext, vec![1, 2, 3]);
        assert_eq!(found.scopes, vec!["repo", "read:org"]);
    }

    #[tokio::test]
    async fn upsert_rotates_token_on_refresh() {
        let pool = memory_pool().await;
        let user_id = Uuid::new_v4();
        upsert(&pool, &sample(user_id)).await.unwrap();
        let mut rotated = sample(user_id);
        rotated.access_token_ciphertext = vec![9, 9, 9];
        upsert(&pool, &rotated).await.unwrap();
        let found = find(&pool, user_id, "github", "github").await.unwrap().unwrap();
        assert_eq!(found.access_token_ciphertext, vec![9, 9, 9]);
    }

    #[tokio::test]
    async fn delete_removes_token() {
        let pool = memory_pool().await;
        let user_id = Uuid::new_v4();
        upsert(&pool, &sample(user_id)).await.unwrap();
        delete(&pool, user_id, "github", "github").await.unwrap();
        assert!(find(&pool, user_id, "github", "github").await.unwrap().is_none());
    }
}
