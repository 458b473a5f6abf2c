use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields the upstream sends beyond the known ones. Kept so results pass
/// through unchanged.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpServerInfo {
    pub name: String,
    pub version: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpProtocolInfo {
    pub version: String,
    pub capabilities: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Result of `mcp/init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpInitResponse {
    pub server: McpServerInfo,
    pub protocol: McpProtocolInfo,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub schema: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Result of `mcp/listTools`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsResponse {
    pub tools: Vec<ToolInfo>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl ToolRequest {
    /// Params for `mcp/callTool`: `{name, args}`.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("name".to_string(), Value::String(self.name.clone()));
        params.insert("args".to_string(), Value::Object(self.args.clone()));
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Result of `mcp/callTool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<ToolContentItem>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub name: String,
    pub uri: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Result of `mcp/listResources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcesResponse {
    pub resources: Vec<ResourceInfo>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub uri: String,
}

impl ResourceRequest {
    /// Params for `mcp/readResource`: `{uri}`.
    pub fn to_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert("uri".to_string(), Value::String(self.uri.clone()));
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContentItem {
    pub uri: String,
    pub text: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Result of `mcp/readResource`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub contents: Vec<ResourceContentItem>,
    #[serde(flatten)]
    pub extra: Extra,
}
