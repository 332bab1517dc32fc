use crate::capability::ToolCapabilities;
use serde::{Deserialize, Serialize};

/// Describes a tool as published in the catalogue — what `hub-registry`
/// discovers from descriptor files and what `hub-tools` hands back to a
/// user deciding what to activate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Path to the executable (or launch command) the Instance Manager spawns.
    pub command: Vec<String>,
    #[serde(default)]
    pub capabilities: ToolCapabilities,
    /// JSON Schema describing the per-user configuration this tool accepts.
    #[serde(default)]
    pub config_schema: serde_json::Value,
}

/// A single call made against a running tool instance, addressed the same
/// way whether it arrives over stdio or HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

/// The result of a `ToolCall`, expressed as a sequence of content blocks
/// so a tool can return mixed text/structured output in one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "json")]
    Json { value: serde_json::Value },
    #[serde(rename = "resource")]
    Resource { uri: String, mime_type: Option<String> },
}

impl ToolResult {
    pub fn text(call_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: vec![ToolContent::Text { text: message.into() }],
            is_error: true,
        }
    }

    /// Concatenates every text block, skipping non-text content.
    pub fn extract_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_joins_text_blocks() {
        let result = ToolResult {
            call_id: "c1".into(),
            content: vec![
                ToolContent::Text { text: "first".into() },
                ToolContent::Json { value: serde_json::json!({"a": 1}) },
                ToolContent::Text { text: "second".into() },
            ],
            is_error: false,
        };
        assert_eq!(result.extract_text(), "first\nsecond");
    }

    #[test]
    fn error_result_sets_flag() {
        let result = ToolResult::error("c2", "boom");
        assert!(result.is_error);
        assert_eq!(result.extract_text(), "boom");
    }
}
