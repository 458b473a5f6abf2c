use std::time::Duration;

use anyhow::Context as _;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_mcp::{
    McpHttpClient, McpHttpClientOptions, McpInitResponse, ResourceRequest, ResourceResponse,
    ResourcesResponse, ToolRequest, ToolResponse, ToolsResponse,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Instrument as _;
use tracing_opentelemetry::OpenTelemetrySpanExt as _;
use url::Url;

use crate::error::GatewayError;

pub const SERVICE_NAME: &str = "MCP Client API";
pub const SERVICE_DESCRIPTION: &str =
    "A REST gateway for interacting with Model Context Protocol (MCP) servers";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Upstream endpoint exactly as configured; echoed by `GET /`.
    pub mcp_server_url: String,
    pub upstream_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct AppState {
    mcp_server_url: String,
    client: McpHttpClient,
}

impl AppState {
    pub fn new(cfg: GatewayConfig) -> anyhow::Result<Self> {
        let endpoint = Url::parse(&cfg.mcp_server_url)
            .with_context(|| format!("parse MCP_SERVER_URL {}", cfg.mcp_server_url))?;
        let client = McpHttpClient::new(McpHttpClientOptions {
            endpoint,
            timeout: cfg.upstream_timeout,
        })
        .context("build upstream client")?;
        Ok(Self {
            mcp_server_url: cfg.mcp_server_url,
            client,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInfo {
    pub name: String,
    pub description: String,
    pub mcp_server: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/server", get(get_server_info))
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .route("/resources", get(list_resources))
        .route("/resources/read", post(read_resource))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                // Headers and bodies stay out of spans.
                let span = tracing::info_span!(
                    "http.request",
                    http_method = %req.method(),
                    http_path = %req.uri().path(),
                );
                let cx = gateway_otel::extract_trace_context(req.headers());
                let _ = span.set_parent(cx);
                span
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root(State(st): State<AppState>) -> Json<GatewayInfo> {
    Json(GatewayInfo {
        name: SERVICE_NAME.to_string(),
        description: SERVICE_DESCRIPTION.to_string(),
        mcp_server: st.mcp_server_url.clone(),
    })
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn get_server_info(
    State(st): State<AppState>,
) -> Result<Json<McpInitResponse>, GatewayError> {
    let init = st
        .client
        .init()
        .instrument(tracing::info_span!("gateway.server_info"))
        .await?;
    Ok(Json(init))
}

async fn list_tools(State(st): State<AppState>) -> Result<Json<ToolsResponse>, GatewayError> {
    let tools = st
        .client
        .list_tools()
        .instrument(tracing::info_span!("gateway.list_tools"))
        .await?;
    Ok(Json(tools))
}

async fn call_tool(
    State(st): State<AppState>,
    payload: Result<Json<ToolRequest>, JsonRejection>,
) -> Result<Json<ToolResponse>, GatewayError> {
    let Json(req) = payload?;
    let resp = st
        .client
        .call_tool(&req)
        .instrument(tracing::info_span!("gateway.call_tool", tool = %req.name))
        .await?;
    Ok(Json(resp))
}

async fn list_resources(
    State(st): State<AppState>,
) -> Result<Json<ResourcesResponse>, GatewayError> {
    let resources = st
        .client
        .list_resources()
        .instrument(tracing::info_span!("gateway.list_resources"))
        .await?;
    Ok(Json(resources))
}

async fn read_resource(
    State(st): State<AppState>,
    payload: Result<Json<ResourceRequest>, JsonRejection>,
) -> Result<Json<ResourceResponse>, GatewayError> {
    let Json(req) = payload?;
    let resp = st
        .client
        .read_resource(&req)
        .instrument(tracing::info_span!("gateway.read_resource", uri = %req.uri))
        .await?;
    Ok(Json(resp))
}
