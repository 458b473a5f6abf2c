use std::time::Duration;

use http::HeaderMap;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::error::McpClientError;
use crate::jsonrpc::{JsonRpcRequest, JsonRpcResponse};
use crate::types::{
    McpInitResponse, ResourceRequest, ResourceResponse, ResourcesResponse, ToolRequest,
    ToolResponse, ToolsResponse,
};

pub const METHOD_INIT: &str = "mcp/init";
pub const METHOD_LIST_TOOLS: &str = "mcp/listTools";
pub const METHOD_CALL_TOOL: &str = "mcp/callTool";
pub const METHOD_LIST_RESOURCES: &str = "mcp/listResources";
pub const METHOD_READ_RESOURCE: &str = "mcp/readResource";

#[derive(Debug, Clone)]
pub struct McpHttpClientOptions {
    pub endpoint: Url,
    /// `None` leaves the transport default in place (no overall deadline).
    pub timeout: Option<Duration>,
}

impl McpHttpClientOptions {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }
}

/// JSON-RPC client for a single upstream MCP server over plain HTTP POST.
///
/// Every call is one request and one response; nothing is retried and no
/// session state is kept, so the client is cheap to clone and share.
#[derive(Debug, Clone)]
pub struct McpHttpClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl McpHttpClient {
    pub fn new(opts: McpHttpClientOptions) -> Result<Self, McpClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = opts.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            endpoint: opts.endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn init(&self) -> Result<McpInitResponse, McpClientError> {
        let result = self.call_mcp_server(METHOD_INIT, Map::new()).await?;
        reshape(result)
    }

    pub async fn list_tools(&self) -> Result<ToolsResponse, McpClientError> {
        let result = self.call_mcp_server(METHOD_LIST_TOOLS, Map::new()).await?;
        reshape(result)
    }

    pub async fn call_tool(&self, req: &ToolRequest) -> Result<ToolResponse, McpClientError> {
        let result = self
            .call_mcp_server(METHOD_CALL_TOOL, req.to_params())
            .await?;
        reshape(result)
    }

    pub async fn list_resources(&self) -> Result<ResourcesResponse, McpClientError> {
        let result = self
            .call_mcp_server(METHOD_LIST_RESOURCES, Map::new())
            .await?;
        reshape(result)
    }

    pub async fn read_resource(
        &self,
        req: &ResourceRequest,
    ) -> Result<ResourceResponse, McpClientError> {
        let result = self
            .call_mcp_server(METHOD_READ_RESOURCE, req.to_params())
            .await?;
        reshape(result)
    }

    /// Sends one JSON-RPC request and unwraps the envelope.
    ///
    /// Returns the `result` value, or `{}` when the upstream omits it.
    pub async fn call_mcp_server(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Value, McpClientError> {
        let outcome = self.send(method, params).await;
        gateway_otel::metrics().record_upstream_call(method, outcome_label(&outcome));
        outcome
    }

    async fn send(&self, method: &str, params: Map<String, Value>) -> Result<Value, McpClientError> {
        let req = JsonRpcRequest::new(method, params);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        gateway_otel::inject_trace_headers(&mut headers);

        let resp = self
            .http
            .post(self.endpoint.clone())
            .headers(headers)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        debug!(method, status = %status, "mcp upstream response");
        if !status.is_success() {
            return Err(McpClientError::Unavailable(format!(
                "upstream returned HTTP {status}"
            )));
        }

        let body = resp.bytes().await?;
        let envelope: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(McpClientError::unavailable)?;

        if let Some(err) = envelope.error {
            return Err(McpClientError::Rejected {
                code: err.code.as_ref().and_then(Value::as_i64),
                message: err.message,
            });
        }

        Ok(match envelope.result {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(v) => v,
        })
    }
}

fn reshape<T: DeserializeOwned>(result: Value) -> Result<T, McpClientError> {
    serde_json::from_value(result).map_err(|e| McpClientError::InvalidResult(e.to_string()))
}

fn outcome_label<T>(outcome: &Result<T, McpClientError>) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(McpClientError::Unavailable(_)) => "unavailable",
        Err(McpClientError::Rejected { .. }) => "rejected",
        Err(McpClientError::InvalidResult(_)) => "invalid_result",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Clone)]
    struct Upstream {
        status: StatusCode,
        body: String,
        seen: Arc<Mutex<Vec<Value>>>,
    }

    async fn upstream_handler(State(st): State<Upstream>, body: String) -> impl IntoResponse {
        let v: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        st.seen.lock().await.push(v);
        (
            st.status,
            [("content-type", "application/json")],
            st.body.clone(),
        )
    }

    async fn start_upstream(
        status: StatusCode,
        body: Value,
    ) -> anyhow::Result<(McpHttpClient, Arc<Mutex<Vec<Value>>>, tokio::task::JoinHandle<()>)>
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let st = Upstream {
            status,
            body: body.to_string(),
            seen: seen.clone(),
        };
        let app = Router::new()
            .route("/mcp", post(upstream_handler))
            .with_state(st);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let endpoint = Url::parse(&format!("http://{addr}/mcp"))?;
        let client = McpHttpClient::new(McpHttpClientOptions::new(endpoint))?;
        Ok((client, seen, handle))
    }

    #[tokio::test]
    async fn call_sends_jsonrpc_envelope_and_unwraps_result() -> anyhow::Result<()> {
        let (client, seen, handle) = start_upstream(
            StatusCode::OK,
            serde_json::json!({ "jsonrpc": "2.0", "result": { "ok": true }, "id": "1" }),
        )
        .await?;

        let mut params = Map::new();
        params.insert("k".to_string(), Value::from("v"));
        let got = client.call_mcp_server("mcp/anything", params).await?;
        assert_eq!(got, serde_json::json!({ "ok": true }));

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            serde_json::json!({
                "jsonrpc": "2.0",
                "method": "mcp/anything",
                "params": { "k": "v" },
                "id": "1"
            })
        );

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn missing_result_defaults_to_empty_object() -> anyhow::Result<()> {
        let (client, _seen, handle) =
            start_upstream(StatusCode::OK, serde_json::json!({ "jsonrpc": "2.0", "id": "1" }))
                .await?;

        let got = client.call_mcp_server(METHOD_INIT, Map::new()).await?;
        assert_eq!(got, serde_json::json!({}));

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn jsonrpc_error_is_rejected_with_upstream_message() -> anyhow::Result<()> {
        let (client, _seen, handle) = start_upstream(
            StatusCode::OK,
            serde_json::json!({ "jsonrpc": "2.0", "error": { "code": 7, "message": "boom" }, "id": "1" }),
        )
        .await?;

        let err = client
            .call_mcp_server(METHOD_LIST_TOOLS, Map::new())
            .await
            .expect_err("should fail");
        match err {
            McpClientError::Rejected { code, message } => {
                assert_eq!(code, Some(7));
                assert_eq!(message, "boom");
            }
            other => anyhow::bail!("unexpected error: {other:?}"),
        }

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn jsonrpc_error_without_code_is_still_rejected() -> anyhow::Result<()> {
        let (client, _seen, handle) = start_upstream(
            StatusCode::OK,
            serde_json::json!({ "jsonrpc": "2.0", "error": { "message": "boom" }, "id": "1" }),
        )
        .await?;

        let err = client
            .call_mcp_server(METHOD_CALL_TOOL, Map::new())
            .await
            .expect_err("should fail");
        match err {
            McpClientError::Rejected { code, message } => {
                assert_eq!(code, None);
                assert_eq!(message, "boom");
            }
            other => anyhow::bail!("unexpected error: {other:?}"),
        }

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_unavailable_even_with_jsonrpc_error_body() -> anyhow::Result<()> {
        let (client, _seen, handle) = start_upstream(
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "jsonrpc": "2.0", "error": { "code": -32602, "message": "Tool 'x' not found" }, "id": "1" }),
        )
        .await?;

        let err = client
            .call_tool(&ToolRequest {
                name: "x".to_string(),
                args: Map::new(),
            })
            .await
            .expect_err("should fail");
        assert!(matches!(err, McpClientError::Unavailable(_)), "{err:?}");
        assert!(err.to_string().starts_with("Failed to communicate with MCP server:"));

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn non_json_body_is_unavailable() -> anyhow::Result<()> {
        let (client, _seen, handle) =
            start_upstream(StatusCode::OK, Value::String("not an envelope".to_string())).await?;

        let err = client
            .call_mcp_server(METHOD_INIT, Map::new())
            .await
            .expect_err("should fail");
        assert!(matches!(err, McpClientError::Unavailable(_)), "{err:?}");

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_upstream_is_unavailable() -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        drop(listener);

        let endpoint = Url::parse(&format!("http://{addr}/mcp"))?;
        let client = McpHttpClient::new(McpHttpClientOptions::new(endpoint))?;
        let err = client.list_resources().await.expect_err("should fail");
        assert!(matches!(err, McpClientError::Unavailable(_)), "{err:?}");
        Ok(())
    }

    #[tokio::test]
    async fn result_of_wrong_shape_is_invalid_result() -> anyhow::Result<()> {
        let (client, _seen, handle) = start_upstream(
            StatusCode::OK,
            serde_json::json!({ "jsonrpc": "2.0", "result": { "tool": [] }, "id": "1" }),
        )
        .await?;

        let err = client.list_tools().await.expect_err("should fail");
        assert!(matches!(err, McpClientError::InvalidResult(_)), "{err:?}");

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn read_resource_sends_uri_and_reshapes() -> anyhow::Result<()> {
        let (client, seen, handle) = start_upstream(
            StatusCode::OK,
            serde_json::json!({
                "jsonrpc": "2.0",
                "result": { "contents": [{ "uri": "docs://interpreting-reports", "text": "read it" }] },
                "id": "1"
            }),
        )
        .await?;

        let got = client
            .read_resource(&ResourceRequest {
                uri: "docs://interpreting-reports".to_string(),
            })
            .await?;
        assert_eq!(got.contents.len(), 1);
        assert_eq!(got.contents[0].text, "read it");

        let seen = seen.lock().await;
        assert_eq!(seen[0]["method"], METHOD_READ_RESOURCE);
        assert_eq!(
            seen[0]["params"],
            serde_json::json!({ "uri": "docs://interpreting-reports" })
        );

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn redirects_are_followed_to_the_final_endpoint() -> anyhow::Result<()> {
        async fn moved() -> impl IntoResponse {
            (StatusCode::TEMPORARY_REDIRECT, [("location", "/mcp/")])
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let st = Upstream {
            status: StatusCode::OK,
            body: serde_json::json!({ "jsonrpc": "2.0", "result": { "ok": true }, "id": "1" })
                .to_string(),
            seen: seen.clone(),
        };
        let app = Router::new()
            .route("/mcp", post(moved))
            .route("/mcp/", post(upstream_handler))
            .with_state(st);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let endpoint = Url::parse(&format!("http://{addr}/mcp"))?;
        let client = McpHttpClient::new(McpHttpClientOptions::new(endpoint))?;
        let got = client.call_mcp_server(METHOD_INIT, Map::new()).await?;
        assert_eq!(got, serde_json::json!({ "ok": true }));

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["method"], METHOD_INIT);

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn slow_upstream_times_out_as_unavailable() -> anyhow::Result<()> {
        async fn stall() -> impl IntoResponse {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK
        }

        let app = Router::new().route("/mcp", post(stall));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let mut opts = McpHttpClientOptions::new(Url::parse(&format!("http://{addr}/mcp"))?);
        opts.timeout = Some(Duration::from_millis(200));
        let client = McpHttpClient::new(opts)?;

        let started = std::time::Instant::now();
        let err = client.list_tools().await.expect_err("should time out");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(err, McpClientError::Unavailable(_)), "{err:?}");
        assert!(err.to_string().starts_with("Failed to communicate with MCP server:"));

        handle.abort();
        Ok(())
    }
}
