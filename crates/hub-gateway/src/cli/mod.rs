pub mod config;

use clap::{Parser, Subcommand};

/// The Hub — a multi-tenant tool gateway speaking MCP-style JSON-RPC plus
/// a REST API.
#[derive(Debug, Parser)]
#[command(name = "hub", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every tool in the catalogue.
    List,
    /// Show metadata for a single tool.
    Tool {
        name: String,
    },
    /// Fetch and print an OpenAPI spec from a URL (descriptor authoring aid).
    Openapi {
        url: String,
    },
    /// Start the gateway server (stdio transport by default).
    Hub {
        #[arg(long, default_value = "stdio")]
        transport: String,
    },
    /// Print runtime info (version, bootstrap state).
    Info,
    /// Print the MCP client config snippet for this gateway.
    McpConfig,
    /// Print version information.
    Version,
    /// Configuration utilities, operating on `system_config` rows.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Dump the resolved configuration (file defaults + system_config overrides) as TOML.
    Show,
    /// Set a single `system_config` key.
    Set { key: String, value: String },
    /// Delete a `system_config` key, reverting it to the file default.
    Reset { key: String },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `HUB_CONFIG` (or
/// `config.toml` by default). Returns the parsed [`Config`] and the path
/// that was used. Shared by `hub` and `config` subcommands.
pub fn load_config() -> anyhow::Result<(hub_domain::config::Config, String)> {
    let config_path = std::env::var("HUB_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path).map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        hub_domain::config::Config::default()
    };

    Ok((config, config_path))
}
