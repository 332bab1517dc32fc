//! JSON-RPC 2.0 wire types for the Hub's tool-call protocol (spec.md §4.6).
//!
//! Lifted near-verbatim from the teacher's MCP *client* encoding — the wire
//! format is symmetric, only which side originates requests differs. Here
//! the Hub is the server: it receives `JsonRpcRequest`s naming one of the
//! call-tool operations below and answers with `JsonRpcResponse`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request (has an `id` — expects a response).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 notification (no `id` — fire-and-forget).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A JSON-RPC 2.0 error object. `code` follows the Hub's error taxonomy
/// (spec.md §7) rather than the JSON-RPC reserved range, except for
/// `method_not_found` which keeps the standard `-32601`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    pub fn from_hub_error(err: &hub_domain::Error) -> Self {
        Self {
            code: err.status_code() as i64,
            message: err.to_string(),
            data: Some(serde_json::json!({ "error_code": err.code() })),
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// The full set of call-tool method names the Hub exposes (spec.md §6).
/// `Dispatcher::dispatch` matches `JsonRpcRequest::method` against these.
pub mod methods {
    pub const GET_AVAILABLE_TOOLS: &str = "get_available_tools";
    pub const GET_TOOL_METADATA: &str = "get_tool_metadata";
    pub const ADD_TOOL: &str = "add_tool";
    pub const REMOVE_TOOL: &str = "remove_tool";
    pub const LIST_MY_TOOLS: &str = "list_my_tools";
    pub const GET_TOOL_CONFIG: &str = "get_tool_config";
    pub const UPDATE_TOOL_CONFIG: &str = "update_tool_config";
    pub const GET_MISSING_CONFIG: &str = "get_missing_config";

    pub const STORE_CREDENTIAL: &str = "store_credential";
    pub const GET_CREDENTIAL: &str = "get_credential";
    pub const LIST_CREDENTIALS: &str = "list_credentials";
    pub const DELETE_CREDENTIAL: &str = "delete_credential";

    pub const LISTEN_FOR_MESSAGE: &str = "listen_for_message";
    pub const SEND_MESSAGE: &str = "send_message";
    pub const SEND_REPLY: &str = "send_reply";
    pub const GET_CHANNEL_HISTORY: &str = "get_channel_history";
    pub const CLEAR_CHANNEL: &str = "clear_channel";
    pub const LIST_ACTIVE_CHANNELS: &str = "list_active_channels";

    pub const START_TIMER: &str = "start_timer";
    pub const GET_TIMER_STATUS: &str = "get_timer_status";
    pub const CANCEL_TIMER: &str = "cancel_timer";
    pub const LIST_ACTIVE_TIMERS: &str = "list_active_timers";
    pub const CLEANUP_TIMERS: &str = "cleanup_timers";
    pub const WAIT_SECONDS: &str = "wait_seconds";
    pub const WAIT_MINUTES: &str = "wait_minutes";
    pub const WAIT_UNTIL_TIMESTAMP: &str = "wait_until_timestamp";
    pub const WAIT_WITH_PROGRESS: &str = "wait_with_progress";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_request_without_params_omits_the_field() {
        let req = JsonRpcRequest::new(2, methods::LIST_MY_TOOLS, None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("params"));
    }

    #[test]
    fn success_response_omits_error_field() {
        let resp = JsonRpcResponse::success(1, serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"error\""));
        assert!(!resp.is_error());
    }

    #[test]
    fn failure_response_omits_result_field() {
        let resp = JsonRpcResponse::failure(1, JsonRpcError::method_not_found("bogus"));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"result\""));
        assert!(resp.is_error());
    }

    #[test]
    fn method_not_found_uses_the_standard_jsonrpc_code() {
        let err = JsonRpcError::method_not_found("nope");
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn roundtrip_request() {
        let req = JsonRpcRequest::new(42, methods::SEND_MESSAGE, Some(serde_json::json!({"channel": "c"})));
        let json = serde_json::to_string(&req).unwrap();
        let parsed: JsonRpcRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, parsed);
    }
}
