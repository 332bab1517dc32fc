//! Maps `hub_domain::Error` onto the REST surface's JSON error body.
//! Every handler returns `Result<T, ApiError>`, so `?` alone is enough to
//! turn a library error into the right status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hub_domain::Error;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(serde_json::json!({
                "code": self.0.code(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
