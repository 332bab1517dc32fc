//! REST router assembly. Mounted under `/api`; `/mcp` is wired in
//! separately by `main.rs` since it carries its own state type
//! (`hub_protocol::transport::SharedMcpHttpState`) rather than
//! `GatewayState`.

pub mod admin;
pub mod catalogue;
pub mod credentials;
pub mod error;
pub mod health;
pub mod server_control;
pub mod setup;
pub mod user_tools;
pub mod workspace;

use axum::routing::{get, post};
use axum::Router;

use crate::state::GatewayState;

pub fn router() -> Router<GatewayState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/info", get(health::info))
        .route("/tools/catalogue", get(catalogue::list_tools))
        .route("/tools/:name/metadata", get(catalogue::tool_metadata))
        .route("/tools/:name/schema", get(catalogue::tool_schema))
        .route("/user/tools", get(user_tools::catalogue))
        .route("/user/tools/running", get(user_tools::list_my_tools))
        .route("/user/tools/:name", post(user_tools::add_tool).delete(user_tools::remove_tool))
        .route("/user/tools/:name/config", get(user_tools::get_config).put(user_tools::update_config))
        .route("/user/tools/:name/missing-config", get(user_tools::missing_config))
        .route("/user/tools/:name/start", post(user_tools::start_instance))
        .route("/user/tools/:name/stop", post(user_tools::stop_instance))
        .route("/user/tools/:name/refresh", post(user_tools::refresh_instance))
        .route("/user/tools/:name/test", post(user_tools::refresh_instance))
        .route("/user/tools/:name/status", get(user_tools::instance_status))
        .route("/user/credentials", get(credentials::list_credentials))
        .route(
            "/user/credentials/:tool_name",
            post(credentials::store_credential).get(credentials::get_credential).delete(credentials::delete_credential),
        )
        .route("/workspace", get(workspace::get_workspace))
        .route("/audit-logs", get(workspace::list_audit_logs))
        .route("/admin/workspaces", get(admin::list_workspaces))
        .route("/admin/audit-logs", get(admin::list_audit_logs))
        .route("/server/status", get(server_control::status))
        .route("/server/apply-config", post(server_control::apply_config))
        .route("/server/health", get(server_control::health))
        .route("/server/restart", post(server_control::restart))
        .route("/setup/status", get(setup::status))
        .route("/setup/mode", get(setup::mode))
        .route("/setup/local", post(setup::setup_local))
        .route("/setup/workos", post(setup::setup_workos))
        .route("/setup/workos/validate", post(setup::validate_workos))
        .route("/setup/upgrade-to-workos", post(setup::upgrade_to_workos))
        .route("/setup/network-config", post(setup::network_config))
        .route("/setup/database-path", post(setup::database_path))
        .route("/setup/browse", get(setup::browse_directory))
        .route("/setup/scan-ports", get(setup::scan_ports))
}
