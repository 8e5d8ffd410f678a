use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

/// Errors raised while probing an MCP endpoint
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for header {name}: {source}")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: InvalidHeaderValue,
    },

    #[error("SSE stream error: {0}")]
    Sse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ProbeError {
    /// Wrap a header conversion failure with the name of the offending header
    pub fn invalid_header(name: &'static str, source: InvalidHeaderValue) -> Self {
        Self::InvalidHeader { name, source }
    }

    /// True when the error came from the network rather than from local input
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Sse(_))
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
