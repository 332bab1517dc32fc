use hub_domain::entities::{AuthType, ToolRegistryEntry};
use serde::Deserialize;

/// On-disk shape of a `tool.toml` descriptor, per spec.md §4.3: `tool_name`,
/// `display_name`, `description`, `category`, `auth_type`, a JSON-schema-
/// flavoured `config_schema`, an optional `required_oauth` scopes list, and
/// an optional icon reference (carried for the dashboard, not persisted).
#[derive(Debug, Clone, Deserialize)]
pub struct RawToolDescriptor {
    pub tool_name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "d_category")]
    pub category: String,
    pub auth_type: RawAuthType,
    #[serde(default)]
    pub config_schema: serde_json::Value,
    #[serde(default)]
    pub required_oauth: Option<Vec<String>>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawAuthType {
    None,
    Key,
    Oauth,
}

fn d_category() -> String {
    "general".into()
}

impl From<RawToolDescriptor> for ToolRegistryEntry {
    fn from(raw: RawToolDescriptor) -> Self {
        ToolRegistryEntry {
            tool_name: raw.tool_name,
            display_name: raw.display_name,
            description: raw.description,
            category: raw.category,
            auth_type: match raw.auth_type {
                RawAuthType::None => AuthType::None,
                RawAuthType::Key => AuthType::Key,
                RawAuthType::Oauth => AuthType::OAuth,
            },
            config_schema: raw.config_schema,
            required_oauth: raw.required_oauth.map(|scopes| scopes.join(" ")),
            capabilities: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_descriptor() {
        let toml_src = r#"
            tool_name = "github"
            display_name = "GitHub"
            auth_type = "oauth"
            required_oauth = ["repo", "read:org"]
        "#;
        let raw: RawToolDescriptor = toml::from_str(toml_src).unwrap();
        let entry: ToolRegistryEntry = raw.into();
        assert_eq!(entry.tool_name, "github");
        assert_eq!(entry.category, "general");
        assert_eq!(entry.required_oauth.as_deref(), Some("repo read:org"));
    }
}
