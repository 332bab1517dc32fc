/// Shared error type used across all Hub crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store: {0}")]
    Store(String),

    #[error("crypto: {0}")]
    Crypto(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("tool {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("instance: {0}")]
    Instance(String),

    #[error("channel: {0}")]
    Channel(String),

    #[error("timer: {0}")]
    Timer(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Maps the error to the `{code, message}` shape the JSON-RPC surface
    /// and the REST API both use for error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Store(_) => "store_error",
            Error::Crypto(_) => "crypto_error",
            Error::Config(_) => "config_error",
            Error::Auth(_) => "auth_error",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::Validation(_) => "validation_error",
            Error::Tool { .. } => "tool_error",
            Error::Instance(_) => "instance_error",
            Error::Channel(_) => "channel_error",
            Error::Timer(_) => "timer_error",
            Error::Timeout(_) => "timeout",
            Error::Forbidden(_) => "forbidden",
            Error::Other(_) => "internal_error",
        }
    }

    /// HTTP status that best matches this error for the REST surface.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::Conflict(_) => 409,
            Error::Validation(_) | Error::Config(_) => 400,
            Error::Auth(_) => 401,
            Error::Forbidden(_) => 403,
            Error::Timeout(_) => 504,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = Error::NotFound("user".into());
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn auth_maps_to_401() {
        assert_eq!(Error::Auth("bad cookie".into()).status_code(), 401);
    }

    #[test]
    fn forbidden_maps_to_403() {
        assert_eq!(Error::Forbidden("not owner".into()).status_code(), 403);
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(Error::Validation("missing field".into()).status_code(), 400);
    }

    #[test]
    fn other_maps_to_500() {
        assert_eq!(Error::Other("boom".into()).status_code(), 500);
    }
}
