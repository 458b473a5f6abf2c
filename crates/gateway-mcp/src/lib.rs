//! Model Context Protocol (MCP) client primitives for the REST gateway.
//!
//! Scoped to what `apps/mcp-rest-gateway` needs: the JSON-RPC envelope, the
//! payload shapes of the five `mcp/*` methods, and a single-endpoint HTTP
//! client that unwraps responses.

mod error;
mod http_client;
mod jsonrpc;
mod types;

pub use error::McpClientError;
pub use http_client::{
    METHOD_CALL_TOOL, METHOD_INIT, METHOD_LIST_RESOURCES, METHOD_LIST_TOOLS,
    METHOD_READ_RESOURCE, McpHttpClient, McpHttpClientOptions,
};
pub use jsonrpc::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, REQUEST_ID};
pub use types::{
    Extra, McpInitResponse, McpProtocolInfo, McpServerInfo, ResourceContentItem, ResourceInfo,
    ResourceRequest, ResourceResponse, ResourcesResponse, ToolContentItem, ToolInfo, ToolRequest,
    ToolResponse, ToolsResponse,
};

/// Upstream endpoint used when `MCP_SERVER_URL` is not set.
pub const DEFAULT_MCP_SERVER_URL: &str = "http://localhost:8888/mcp";
