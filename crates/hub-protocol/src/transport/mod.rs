pub mod http;
pub mod stdio;

pub use http::{handle_mcp_request, McpHttpState, SharedMcpHttpState};
pub use stdio::StdioServer;
