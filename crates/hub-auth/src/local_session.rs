//! `local_session` cookie: a signed, unencrypted payload for single-tenant
//! Local Mode (spec.md §4.2). Mirrors the teacher's bearer-token check in
//! `sa_gateway::api::auth::require_api_token` — hash/sign with the same
//! `sha2` + `hmac` + `subtle::ConstantTimeEq` idiom, just over a JSON claim
//! set instead of a single opaque token.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use hub_domain::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub workspace_id: Uuid,
    pub is_super_admin: bool,
    pub iat: i64,
    pub exp: i64,
}

impl LocalSessionClaims {
    pub fn new(user_id: Uuid, email: String, workspace_id: Uuid, is_super_admin: bool, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email,
            workspace_id,
            is_super_admin,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Signs `claims` into a `<payload>.<signature>` cookie value. The payload
/// is base64url(JSON(claims)); the signature is HMAC-SHA256 over the
/// payload bytes, also base64url-encoded.
pub fn sign(claims: &LocalSessionClaims, signing_secret: &str) -> Result<String> {
    let payload_json = serde_json::to_vec(claims)?;
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload_json);

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| Error::Crypto(format!("local session HMAC key: {e}")))?;
    mac.update(payload_b64.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{payload_b64}.{signature_b64}"))
}

/// Verifies a cookie value produced by [`sign`]. Checks the signature in
/// constant time before ever looking at the claims, then enforces `exp`.
pub fn verify(cookie_value: &str, signing_secret: &str) -> Result<LocalSessionClaims> {
    let (payload_b64, signature_b64) = cookie_value
        .split_once('.')
        .ok_or_else(|| Error::Auth("malformed local session cookie".into()))?;

    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .map_err(|e| Error::Crypto(format!("local session HMAC key: {e}")))?;
    mac.update(payload_b64.as_bytes());
    let expected = mac.finalize().into_bytes();

    let provided = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| Error::Auth("malformed local session signature".into()))?;

    if !bool::from(expected.as_slice().ct_eq(&provided)) {
        return Err(Error::Auth("local session signature mismatch".into()));
    }

    let payload_json = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| Error::Auth("malformed local session payload".into()))?;
    let claims: LocalSessionClaims =
        serde_json::from_slice(&payload_json).map_err(|e| Error::Auth(format!("corrupt local session claims: {e}")))?;

    if claims.is_expired(Utc::now()) {
        return Err(Error::Auth("local session expired".into()));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> LocalSessionClaims {
        LocalSessionClaims::new(Uuid::new_v4(), "jane@example.com".into(), Uuid::new_v4(), true, Duration::days(30))
    }

    #[test]
    fn sign_then_verify_roundtrips() {
        let claims = sample_claims();
        let cookie = sign(&claims, "secret").unwrap();
        let verified = verify(&cookie, "secret").unwrap();
        assert_eq!(verified.user_id, claims.user_id);
        assert_eq!(verified.email, claims.email);
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let cookie = sign(&sample_claims(), "secret").unwrap();
        assert!(verify(&cookie, "other-secret").is_err());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let cookie = sign(&sample_claims(), "secret").unwrap();
        let (payload, sig) = cookie.split_once('.').unwrap();
        let tampered = format!("{payload}x.{sig}");
        assert!(verify(&tampered, "secret").is_err());
    }

    #[test]
    fn verify_rejects_expired_session() {
        let claims = LocalSessionClaims::new(Uuid::new_v4(), "jane@example.com".into(), Uuid::new_v4(), false, Duration::seconds(-1));
        let cookie = sign(&claims, "secret").unwrap();
        assert!(verify(&cookie, "secret").is_err());
    }

    #[test]
    fn verify_rejects_malformed_cookie() {
        assert!(verify("not-a-valid-cookie", "secret").is_err());
    }
}
