use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use gateway_mcp::DEFAULT_MCP_SERVER_URL;
use gateway_otel::TracingInitOptions;
use tracing::info;

mod app;
mod error;

#[derive(Debug, Parser)]
#[command(
    name = "mcp-rest-gateway",
    version,
    about = "REST surface for a single JSON-RPC MCP server"
)]
struct Args {
    /// JSON-RPC endpoint of the upstream MCP server.
    #[arg(long, env = "MCP_SERVER_URL", default_value = DEFAULT_MCP_SERVER_URL)]
    mcp_server_url: String,

    /// Address the REST surface listens on.
    #[arg(long, env = "MCP_GATEWAY_ADDR", default_value = "0.0.0.0:8001")]
    addr: SocketAddr,

    /// Overall deadline for each upstream call. Unset: no deadline.
    #[arg(long, env = "MCP_GATEWAY_UPSTREAM_TIMEOUT_SECS")]
    upstream_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gateway_otel::init_tracing(TracingInitOptions {
        service_name: "mcp-rest-gateway",
        service_version: env!("CARGO_PKG_VERSION"),
        default_env_filter: "info,hyper=warn,reqwest=warn",
    })?;

    let args = Args::parse();
    let state = app::AppState::new(app::GatewayConfig {
        mcp_server_url: args.mcp_server_url.clone(),
        upstream_timeout: args.upstream_timeout_secs.map(Duration::from_secs),
    })?;

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("bind {}", args.addr))?;
    info!(
        addr = %args.addr,
        mcp_server_url = %args.mcp_server_url,
        "starting MCP REST gateway"
    );

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
