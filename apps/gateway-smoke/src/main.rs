use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gateway_mcp::{ResourceRequest, ToolRequest};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

const SAMPLE_TOOL: &str = "run-analysis-report";
const SAMPLE_RESOURCE_URI: &str = "docs://interpreting-reports";

#[derive(Debug, Parser)]
#[command(
    name = "gateway-smoke",
    version,
    about = "Manual smoke test for the MCP REST gateway"
)]
struct Args {
    /// Base URL of a running gateway.
    #[arg(long, env = "API_BASE", default_value = "http://localhost:8001")]
    api_base: String,

    /// Per-request timeout.
    #[arg(long, env = "API_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// GET /server
    Server,
    /// GET /tools
    Tools,
    /// POST /tools/call
    CallTool {
        #[arg(long, default_value = SAMPLE_TOOL)]
        name: String,
        /// JSON object passed as the tool's `args`.
        #[arg(long, default_value = "{\"days\":3}")]
        args: String,
    },
    /// GET /resources
    Resources,
    /// POST /resources/read
    ReadResource {
        #[arg(long, default_value = SAMPLE_RESOURCE_URI)]
        uri: String,
    },
    /// Every endpoint in turn with the sample inputs (default).
    All,
}

struct SmokeClient {
    http: reqwest::Client,
    api_base: String,
}

impl SmokeClient {
    fn new(api_base: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self
            .http
            .get(format!("{}{path}", self.api_base))
            .send()
            .await
            .with_context(|| format!("GET {path}"))?;
        read_body(resp).await
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> anyhow::Result<(StatusCode, Value)> {
        let resp = self
            .http
            .post(format!("{}{path}", self.api_base))
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        read_body(resp).await
    }
}

/// Non-JSON bodies are returned as a JSON string so they still print.
async fn read_body(resp: reqwest::Response) -> anyhow::Result<(StatusCode, Value)> {
    let status = resp.status();
    let text = resp.text().await.context("read response body")?;
    debug!(status = %status, bytes = text.len(), "gateway response");
    let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, body))
}

fn parse_tool_args(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("parse --args as JSON")? {
        Value::Object(m) => Ok(m),
        other => anyhow::bail!("--args must be a JSON object, got {other}"),
    }
}

async fn run(client: &SmokeClient, cmd: Command) -> anyhow::Result<Vec<(String, StatusCode, Value)>> {
    let mut out = Vec::new();
    match cmd {
        Command::Server => {
            let (status, body) = client.get("/server").await?;
            out.push(("server info".to_string(), status, body));
        }
        Command::Tools => {
            let (status, body) = client.get("/tools").await?;
            out.push(("list tools".to_string(), status, body));
        }
        Command::CallTool { name, args } => {
            let req = ToolRequest {
                args: parse_tool_args(&args)?,
                name,
            };
            let (status, body) = client.post("/tools/call", &req).await?;
            out.push((format!("call tool ({})", req.name), status, body));
        }
        Command::Resources => {
            let (status, body) = client.get("/resources").await?;
            out.push(("list resources".to_string(), status, body));
        }
        Command::ReadResource { uri } => {
            let req = ResourceRequest { uri };
            let (status, body) = client.post("/resources/read", &req).await?;
            out.push((format!("read resource ({})", req.uri), status, body));
        }
        Command::All => {
            let steps = [
                Command::Server,
                Command::Tools,
                Command::CallTool {
                    name: SAMPLE_TOOL.to_string(),
                    args: "{\"days\":3}".to_string(),
                },
                Command::Resources,
                Command::ReadResource {
                    uri: SAMPLE_RESOURCE_URI.to_string(),
                },
            ];
            for step in steps {
                out.extend(Box::pin(run(client, step)).await?);
            }
        }
    }
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .json()
        .init();

    let args = Args::parse();
    let client = SmokeClient::new(&args.api_base, Duration::from_secs(args.timeout_secs))?;

    for (label, status, body) in run(&client, args.cmd.unwrap_or(Command::All)).await? {
        println!("Testing {label}... [{status}]");
        println!("{}", serde_json::to_string_pretty(&body)?);
        println!();
    }
    Ok(())
}
