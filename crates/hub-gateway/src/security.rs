//! CORS, security headers, request-id stamping, and the setup-required
//! gate.
//!
//! `build_cors_layer` is a wildcard-port CORS predicate that reads from
//! the store-backed `RuntimeConfig` instead of a static file config, since
//! allowed origins can change at runtime via the setup wizard without a
//! restart.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use tower_http::cors::{AllowOrigin, CorsLayer};
use uuid::Uuid;

use crate::state::GatewayState;

pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.len() == 1 && allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed, credentials disabled");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .max_age(std::time::Duration::from_secs(600));
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in allowed_origins {
        if let Some(prefix) = origin.strip_suffix('*') {
            wildcard_prefixes.push(prefix.to_string());
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(600))
}

const CSP: &str = "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; frame-ancestors 'none'; form-action 'self'";
const PERMISSIONS_POLICY: &str = "camera=(), microphone=(), geolocation=(), payment=()";

/// Stamps security headers and an `X-Request-Id` on every response.
/// HSTS is only added when the runtime config enables it — it's a
/// one-way ratchet in browsers, so it must never be sent over plain HTTP
/// or before the operator has opted in.
pub async fn security_headers(State(state): State<GatewayState>, req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert("permissions-policy", HeaderValue::from_static(PERMISSIONS_POLICY));
    headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP));
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        headers.insert("x-request-id", v);
    }

    if let Ok(runtime) = state.runtime_config.get_or_reload(&state.services.pool, &state.config).await {
        if runtime.hsts_enabled {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, HeaderValue::from_static("max-age=63072000; includeSubDomains"));
        }
        if let Some(uri) = &runtime.csp_report_uri {
            if let Ok(v) = HeaderValue::from_str(&format!("{CSP}; report-uri {uri}")) {
                headers.insert(header::CONTENT_SECURITY_POLICY, v);
            }
        }
    }

    response
}

/// Paths reachable while the Hub hasn't finished initial setup. Everything
/// else redirects browsers to `/app/setup` and answers API clients with a
/// structured 503.
fn is_setup_whitelisted(path: &str) -> bool {
    path.starts_with("/api/setup")
        || path.starts_with("/app")
        || path == "/api/health"
        || path == "/api/server/health"
        || path == "/api/info"
}

pub async fn setup_required_gate(State(state): State<GatewayState>, req: Request<Body>, next: Next) -> Response {
    if state.is_configured() || is_setup_whitelisted(req.uri().path()) {
        return next.run(req).await;
    }

    let wants_html = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);

    if wants_html {
        axum::response::Redirect::to("/app/setup").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "code": "setup_required",
                "message": "the Hub has not completed initial setup",
                "setup_url": "/app/setup",
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // `CorsLayer` doesn't expose its predicate for direct inspection, so
    // these tests exercise the same wildcard-port matching logic
    // `build_cors_layer` closes over, rather than poking at tower_http
    // internals.
    fn allowed(origins: &[String], origin: &str) -> bool {
        let exact: Vec<String> = origins.iter().filter(|o| !o.ends_with('*')).cloned().collect();
        let wildcards: Vec<String> = origins.iter().filter_map(|o| o.strip_suffix('*').map(str::to_string)).collect();
        if exact.iter().any(|e| e == origin) {
            return true;
        }
        wildcards.iter().any(|prefix| origin.strip_prefix(prefix.as_str()).map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit())).unwrap_or(false))
    }

    #[test]
    fn wildcard_port_matches_any_port() {
        let origins = vec!["http://localhost:*".to_string()];
        assert!(allowed(&origins, "http://localhost:3000"));
        assert!(allowed(&origins, "http://localhost:51234"));
    }

    #[test]
    fn wildcard_port_rejects_non_digit_suffix() {
        let origins = vec!["http://localhost:*".to_string()];
        assert!(!allowed(&origins, "http://localhost:3000.evil.com"));
        assert!(!allowed(&origins, "http://localhost:abc"));
    }

    #[test]
    fn exact_origin_matches_only_itself() {
        let origins = vec!["https://app.example.com".to_string()];
        assert!(allowed(&origins, "https://app.example.com"));
        assert!(!allowed(&origins, "https://evil.example.com"));
    }

    #[test]
    fn build_cors_layer_does_not_panic_on_invalid_origin() {
        let origins = vec!["not a valid origin".to_string(), "http://localhost:*".to_string()];
        let _ = build_cors_layer(&origins);
    }

    #[test]
    fn setup_whitelist_covers_setup_and_health_paths() {
        assert!(is_setup_whitelisted("/api/setup/status"));
        assert!(is_setup_whitelisted("/api/health"));
        assert!(is_setup_whitelisted("/api/server/health"));
        assert!(is_setup_whitelisted("/api/info"));
        assert!(is_setup_whitelisted("/app/setup"));
    }

    #[test]
    fn setup_whitelist_rejects_other_api_paths() {
        assert!(!is_setup_whitelisted("/api/user/tools"));
        assert!(!is_setup_whitelisted("/api/admin/workspaces"));
    }
}
