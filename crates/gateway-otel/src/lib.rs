//! Logging, trace propagation and counters shared by the gateway binaries.
//!
//! Logs are always JSON on stdout. OTLP export of spans and counters is
//! switched on by `OTEL_EXPORTER_OTLP_ENDPOINT` or `MCP_GATEWAY_OTEL=1`.

use std::sync::OnceLock;

use anyhow::Context as _;
use http::HeaderMap;
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::trace::{TraceContextExt as _, TracerProvider as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig as _};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};
use tracing_opentelemetry::OpenTelemetrySpanExt as _;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_OTLP_ENDPOINT: &str = "http://127.0.0.1:4318";

static PROPAGATOR_INSTALLED: OnceLock<()> = OnceLock::new();
static METRICS: OnceLock<Metrics> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct TracingInitOptions<'a> {
    pub service_name: &'a str,
    pub service_version: &'a str,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_env_filter: &'a str,
}

pub fn init_tracing(opts: TracingInitOptions<'_>) -> anyhow::Result<()> {
    ensure_propagator_installed();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(opts.default_env_filter));
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json());

    if !otel_enabled() {
        registry.try_init().context("install tracing subscriber")?;
        return Ok(());
    }

    let resource = Resource::builder()
        .with_service_name(opts.service_name.to_string())
        .with_attributes([KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
            opts.service_version.to_string(),
        )])
        .build();
    let tracer_provider = build_tracer_provider(resource.clone())?;
    let meter_provider = build_meter_provider(resource)?;

    let tracer = tracer_provider.tracer(opts.service_name.to_string());
    opentelemetry::global::set_tracer_provider(tracer_provider);
    opentelemetry::global::set_meter_provider(meter_provider);

    registry
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .context("install tracing subscriber")?;
    Ok(())
}

fn build_tracer_provider(resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(signal_endpoint("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT", "/v1/traces"))
        .with_protocol(Protocol::HttpBinary)
        .build()
        .context("build otlp span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_resource(resource)
        .build())
}

fn build_meter_provider(resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_endpoint(signal_endpoint("OTEL_EXPORTER_OTLP_METRICS_ENDPOINT", "/v1/metrics"))
        .with_protocol(Protocol::HttpBinary)
        .build()
        .context("build otlp metric exporter")?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(resource)
        .build())
}

fn ensure_propagator_installed() {
    PROPAGATOR_INSTALLED.get_or_init(|| {
        opentelemetry::global::set_text_map_propagator(
            opentelemetry_sdk::propagation::TraceContextPropagator::new(),
        );
    });
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_true(name: &str) -> bool {
    non_empty_env(name).is_some_and(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn otel_enabled() -> bool {
    non_empty_env("OTEL_EXPORTER_OTLP_ENDPOINT").is_some() || env_true("MCP_GATEWAY_OTEL")
}

/// Per-signal override first, then `<base>/<path>`.
fn signal_endpoint(override_var: &str, path: &str) -> String {
    if let Some(v) = non_empty_env(override_var) {
        return v;
    }
    let base = non_empty_env("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_string());
    join_otlp_endpoint(&base, path)
}

fn join_otlp_endpoint(base: &str, path: &str) -> String {
    format!("{}{path}", base.trim_end_matches('/'))
}

/// Adds `traceparent` for the current span, if it carries a valid context.
pub fn inject_trace_headers(headers: &mut HeaderMap) {
    ensure_propagator_installed();

    let cx = tracing::Span::current().context();
    if !cx.span().span_context().is_valid() {
        return;
    }

    opentelemetry::global::get_text_map_propagator(|prop| {
        prop.inject_context(&cx, &mut HeaderInjector { headers });
    });
}

pub fn extract_trace_context(headers: &HeaderMap) -> Context {
    ensure_propagator_installed();
    opentelemetry::global::get_text_map_propagator(|prop| {
        prop.extract(&HeaderExtractor { headers })
    })
}

struct HeaderInjector<'a> {
    headers: &'a mut HeaderMap,
}

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        let Ok(name) = http::header::HeaderName::from_bytes(key.as_bytes()) else {
            return;
        };
        let Ok(val) = http::header::HeaderValue::from_str(&value) else {
            return;
        };
        self.headers.insert(name, val);
    }
}

struct HeaderExtractor<'a> {
    headers: &'a HeaderMap,
}

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.headers.keys().map(|k| k.as_str()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Metrics {
    upstream_calls_total: opentelemetry::metrics::Counter<u64>,
    http_errors_total: opentelemetry::metrics::Counter<u64>,
}

/// Counters are no-ops until a meter provider is installed by `init_tracing`.
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let meter = opentelemetry::global::meter("mcp-rest-gateway");

        let upstream_calls_total = meter
            .u64_counter("mcp_gateway_upstream_calls_total")
            .with_description("JSON-RPC calls sent to the upstream MCP server.")
            .build();

        let http_errors_total = meter
            .u64_counter("mcp_gateway_http_errors_total")
            .with_description("Error responses returned on the REST surface.")
            .build();

        Metrics {
            upstream_calls_total,
            http_errors_total,
        }
    })
}

impl Metrics {
    pub fn record_upstream_call(&self, method: &str, outcome: &str) {
        self.upstream_calls_total.add(
            1,
            &[
                KeyValue::new("method", method.to_string()),
                KeyValue::new("outcome", outcome.to_string()),
            ],
        );
    }

    pub fn record_http_error(&self, kind: &str, status: u16) {
        self.http_errors_total.add(
            1,
            &[
                KeyValue::new("kind", kind.to_string()),
                KeyValue::new("status", i64::from(status)),
            ],
        );
    }
}
