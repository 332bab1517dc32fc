//! The Hub's tool-call protocol surface (spec.md §4.6): JSON-RPC 2.0 wire
//! types, an ordered middleware pipeline, the call-tool dispatcher, and the
//! stdio/HTTP transports that carry it.

pub mod context;
pub mod dispatch;
pub mod middleware;
pub mod protocol;
pub mod transport;

pub use context::RequestContext;
pub use dispatch::{Dispatcher, HubServices};
pub use protocol::{JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
