use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use hub_domain::config::ConfigSeverity;
use hub_gateway::cli::{Cli, Command, ConfigCommand};
use hub_gateway::state::GatewayState;
use hub_gateway::{app, bootstrap};
use hub_protocol::dispatch::Dispatcher;
use hub_protocol::transport::StdioServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let otel_guard = init_tracing(&config.observability);
            let result = run_server(config, "stdio").await;
            drop(otel_guard);
            result
        }
        Some(Command::Hub { transport }) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let otel_guard = init_tracing(&config.observability);
            let result = run_server(config, &transport).await;
            drop(otel_guard);
            result
        }
        Some(Command::List) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let state = bootstrap::build(config).await?;
            let tools = hub_tools::catalogue::list_available_tools(&state.services.pool).await?;
            for tool in tools {
                println!("{}\t{}", tool.tool_name, tool.description);
            }
            Ok(())
        }
        Some(Command::Tool { name }) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let state = bootstrap::build(config).await?;
            let entry = hub_tools::catalogue::get_tool_metadata(&state.services.pool, &name).await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
            Ok(())
        }
        Some(Command::Openapi { url }) => {
            let body = reqwest::get(&url).await.context("fetching OpenAPI spec")?.text().await?;
            println!("{body}");
            Ok(())
        }
        Some(Command::Info) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let state = bootstrap::build(config).await?;
            println!(
                "{}",
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "configured": state.is_configured(),
                })
            );
            Ok(())
        }
        Some(Command::McpConfig) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "mcpServers": {
                        "hub": {
                            "command": "hub",
                            "args": ["hub", "--transport", "stdio"],
                        }
                    },
                    "httpUrl": format!("http://{}:{}/mcp", config.server.host, config.server.port),
                }))?
            );
            Ok(())
        }
        Some(Command::Version) => {
            println!("hub {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let state = bootstrap::build(config).await?;
            hub_gateway::cli::config::show(&state.config, &state.services.pool).await
        }
        Some(Command::Config(ConfigCommand::Set { key, value })) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let state = bootstrap::build(config).await?;
            hub_gateway::cli::config::set(&state.services.pool, &key, &value).await
        }
        Some(Command::Config(ConfigCommand::Reset { key })) => {
            let (config, _config_path) = hub_gateway::cli::load_config()?;
            let state = bootstrap::build(config).await?;
            hub_gateway::cli::config::reset(&state.services.pool, &key).await
        }
    }
}

/// Holds the SDK tracer provider alive for the process lifetime; dropping
/// it flushes any spans still buffered in the batch exporter.
struct OtelGuard(opentelemetry_sdk::trace::SdkTracerProvider);

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.shutdown() {
            tracing::warn!(error = %e, "error shutting down OTLP tracer provider");
        }
    }
}

/// Structured JSON logging always. An OTLP span exporter is layered in on
/// top when `[observability].otlp_endpoint` is set; otherwise the gateway
/// behaves exactly as it does with observability left at its defaults.
fn init_tracing(config: &hub_domain::config::ObservabilityConfig) -> Option<OtelGuard> {
    use opentelemetry::trace::TracerProvider as _;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hub_gateway=debug"));
    let fmt_layer = tracing_subscriber::fmt::layer().json();

    let Some(endpoint) = &config.otlp_endpoint else {
        tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
        return None;
    };

    let exporter = match opentelemetry_otlp::SpanExporter::builder().with_tonic().with_endpoint(endpoint).build() {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
            tracing::warn!(error = %e, endpoint = %endpoint, "failed to build OTLP exporter — continuing with JSON logging only");
            return None;
        }
    };

    let resource = opentelemetry_sdk::Resource::builder().with_service_name(config.service_name.clone()).build();
    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(config.sample_rate))
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());
    let tracer = provider.tracer("hub-gateway");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
    tracing_subscriber::registry().with(env_filter).with(fmt_layer).with(otel_layer).init();

    Some(OtelGuard(provider))
}

/// Start the gateway server with the given configuration and transport
/// (`stdio` or `http`).
async fn run_server(config: hub_domain::config::Config, transport: &str) -> anyhow::Result<()> {
    tracing::info!("Hub starting");

    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!("config validation failed with {} error(s)", issues.iter().filter(|i| i.severity == ConfigSeverity::Error).count());
    }

    let state = bootstrap::build(config).await.context("bootstrapping gateway state")?;

    if transport == "stdio" {
        return run_stdio(state).await;
    }

    run_http(state).await
}

/// The Hub speaking newline-delimited JSON-RPC over its own stdin/stdout —
/// the default when launched as an MCP server process directly.
async fn run_stdio(state: GatewayState) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(state.services.clone());
    let server = StdioServer::new(dispatcher, None);
    tracing::info!("Hub listening on stdio");
    server.serve(&state.pipeline).await.context("stdio transport error")
}

async fn run_http(state: GatewayState) -> anyhow::Result<()> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = app::build(state).await.context("assembling HTTP router")?;

    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, "Hub listening");

    axum::serve(listener, router).await.context("axum server error")
}
