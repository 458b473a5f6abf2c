use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gateway_mcp::McpClientError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// REST error body: `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream unreachable, timed out, non-2xx, or unreadable.
    #[error("{0}")]
    Unavailable(String),

    /// Upstream answered with a JSON-RPC error; message is passed on as-is.
    #[error("{message}")]
    Rejected { code: Option<i64>, message: String },

    #[error("{0}")]
    InvalidUpstreamResponse(String),

    /// Inbound body did not match the declared request shape.
    #[error("{0}")]
    InvalidRequest(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // Flat mapping: every JSON-RPC error code becomes 400.
            Self::Rejected { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "gateway_unavailable",
            Self::Rejected { .. } => "upstream_rejected",
            Self::InvalidUpstreamResponse(_) => "invalid_upstream_response",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<McpClientError> for GatewayError {
    fn from(e: McpClientError) -> Self {
        let detail = e.to_string();
        match e {
            McpClientError::Unavailable(_) => Self::Unavailable(detail),
            McpClientError::Rejected { code, message } => Self::Rejected { code, message },
            McpClientError::InvalidResult(_) => Self::InvalidUpstreamResponse(detail),
        }
    }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        if status.is_server_error() {
            error!(kind, status = status.as_u16(), error = %self, "request failed");
        } else if let Self::Rejected { code, .. } = &self {
            warn!(kind, status = status.as_u16(), rpc_code = code, error = %self, "request rejected");
        } else {
            warn!(kind, status = status.as_u16(), error = %self, "request rejected");
        }
        gateway_otel::metrics().record_http_error(kind, status.as_u16());

        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
