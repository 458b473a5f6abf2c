use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpClientError {
    /// The upstream could not be reached or answered with something other
    /// than a 2xx JSON body.
    #[error("Failed to communicate with MCP server: {0}")]
    Unavailable(String),

    /// The upstream answered with a JSON-RPC `error` object. `code` is `None`
    /// when the object carried no integer code.
    #[error("{message}")]
    Rejected { code: Option<i64>, message: String },

    /// The `result` did not fit the shape declared for the method.
    #[error("Invalid response from MCP server: {0}")]
    InvalidResult(String),
}

impl McpClientError {
    pub(crate) fn unavailable(e: impl std::fmt::Display) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<reqwest::Error> for McpClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::unavailable(e)
    }
}
