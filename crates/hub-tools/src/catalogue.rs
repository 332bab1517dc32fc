use hub_domain::entities::{AuthType, ToolRegistryEntry, UserTool};
use hub_domain::{Error, Result};
use hub_store::repo::{oauth_token, tool_config, tool_registry, user_tool};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::activation::{missing_required_keys, validate_required};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Active,
    MissingConfig,
    NotInstalled,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogueEntry {
    #[serde(flatten)]
    pub descriptor: ToolRegistryEntry,
    pub status: ToolStatus,
    pub missing: Vec<String>,
}

/// `list_available_tools()` — the global catalogue, unannotated.
pub async fn list_available_tools(pool: &SqlitePool) -> Result<Vec<ToolRegistryEntry>> {
    tool_registry::all(pool).await
}

/// `get_tool_metadata(tool_name)` — a single descriptor.
pub async fn get_tool_metadata(pool: &SqlitePool, tool_name: &str) -> Result<ToolRegistryEntry> {
    tool_registry::find_by_name(pool, tool_name)
        .await?
        .ok_or_else(|| Error::NotFound(format!("tool {tool_name}")))
}

/// `get_catalogue(user_id)` — the global catalogue annotated with this
/// user's per-tool status. "active" requires: enabled AND every
/// schema-required key present AND (if oauth) a matching OAuthToken.
pub async fn get_catalogue(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<CatalogueEntry>> {
    let descriptors = tool_registry::all(pool).await?;
    let mut entries = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let installed = user_tool::find(pool, user_id, &descriptor.tool_name).await?;
        let Some(installed) = installed.filter(|t| t.enabled) else {
            entries.push(CatalogueEntry { descriptor, status: ToolStatus::NotInstalled, missing: Vec::new() });
            continue;
        };
        let _ = installed;

        let configs = tool_config::list_for_user_tool(pool, user_id, &descriptor.tool_name).await?;
        let config_value = configs_to_json(&configs);
        let mut missing = missing_required_keys(&descriptor.config_schema, &config_value);

        if descriptor.auth_type == AuthType::OAuth {
            let provider = descriptor.required_oauth.as_deref().unwrap_or(&descriptor.tool_name);
            if oauth_token::find(pool, user_id, &descriptor.tool_name, provider).await?.is_none() {
                missing.push("oauth_token".to_string());
            }
        }

        let status = if missing.is_empty() { ToolStatus::Active } else { ToolStatus::MissingConfig };
        entries.push(CatalogueEntry { descriptor, status, missing });
    }

    Ok(entries)
}

fn configs_to_json(configs: &[hub_domain::entities::ToolConfig]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for cfg in configs {
        let value = serde_json::from_str(&cfg.config_value).unwrap_or(serde_json::Value::String(cfg.config_value.clone()));
        map.insert(cfg.config_key.clone(), value);
    }
    serde_json::Value::Object(map)
}

/// `add_tool(user_id, tool_name, config)` — validates, then upserts
/// `UserTool(enabled=true)` and every config key. Idempotent.
pub async fn add_tool(pool: &SqlitePool, user_id: Uuid, tool_name: &str, config: &serde_json::Value) -> Result<()> {
    let descriptor = get_tool_metadata(pool, tool_name).await?;
    validate_required(&descriptor.config_schema, config)?;

    user_tool::upsert(pool, &UserTool { user_id, tool_name: tool_name.to_string(), enabled: true }).await?;

    if let Some(obj) = config.as_object() {
        for (key, value) in obj {
            tool_config::set(
                pool,
                &hub_domain::entities::ToolConfig {
                    user_id,
                    tool_name: tool_name.to_string(),
                    config_key: key.clone(),
                    config_value: value.to_string(),
                },
            )
            .await?;
        }
    }
    Ok(())
}

/// `remove_tool` — soft-disable; config and credentials survive for re-enable.
pub async fn remove_tool(pool: &SqlitePool, user_id: Uuid, tool_name: &str) -> Result<()> {
    user_tool::upsert(pool, &UserTool { user_id, tool_name: tool_name.to_string(), enabled: false }).await
}

/// `update_tool_config` — merge-update: only the keys present in `partial`
/// change, everything else is left as-is.
pub async fn update_tool_config(pool: &SqlitePool, user_id: Uuid, tool_name: &str, partial: &serde_json::Value) -> Result<()> {
    let Some(obj) = partial.as_object() else {
        return Err(Error::Validation("tool config partial must be a JSON object".into()));
    };
    for (key, value) in obj {
        tool_config::set(
            pool,
            &hub_domain::entities::ToolConfig {
                user_id,
                tool_name: tool_name.to_string(),
                config_key: key.clone(),
                config_value: value.to_string(),
            },
        )
        .await?;
    }
    Ok(())
}

/// `get_tool_config(user_id, tool_name)` — the persisted config as a flat
/// JSON object, one key per row.
pub async fn get_tool_config(pool: &SqlitePool, user_id: Uuid, tool_name: &str) -> Result<serde_json::Value> {
    let configs = tool_config::list_for_user_tool(pool, user_id, tool_name).await?;
    Ok(configs_to_json(&configs))
}

/// `get_missing_config` — schema-required keys not yet persisted for this
/// (user, tool) pair.
pub async fn get_missing_config(pool: &SqlitePool, user_id: Uuid, tool_name: &str) -> Result<Vec<String>> {
    let descriptor = get_tool_metadata(pool, tool_name).await?;
    let configs = tool_config::list_for_user_tool(pool, user_id, tool_name).await?;
    Ok(missing_required_keys(&descriptor.config_schema, &configs_to_json(&configs)))
}
