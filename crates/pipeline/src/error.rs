//! Pipeline Error Types
//!
//! Transport-level failures talking to the pipeline backend. Line-level
//! decode failures are not represented here: they never leave the decoder.

use thiserror::Error;

/// Errors raised while reaching or reading from the pipeline backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Connection refused, DNS failure, TLS failure, timeout
    #[error("Network error: {message}")]
    NetworkError { message: String },

    /// Response body failed mid-stream
    #[error("Stream read error: {message}")]
    StreamError { message: String },

    #[error("Invalid request (HTTP 400): {message}")]
    InvalidRequest { message: String },

    #[error("Endpoint not found (HTTP 404): {url}")]
    NotFound { url: String },

    #[error("Rate limited (HTTP 429): {message}")]
    RateLimited { message: String },

    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success status
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16, body: String },

    /// Response was not the expected JSON shape
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Client could not be built from the supplied settings
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias for pipeline errors
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn network(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::NetworkError {
            message: describe_error(err),
        }
    }

    pub fn stream(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::StreamError {
            message: describe_error(err),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: msg.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::InvalidRequest { .. } => Some(400),
            PipelineError::NotFound { .. } => Some(404),
            PipelineError::RateLimited { .. } => Some(429),
            PipelineError::ServerError { status, .. } | PipelineError::HttpStatus { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

/// Map a non-success HTTP status to a pipeline error.
pub fn parse_http_error(status: u16, body: &str, url: &str) -> PipelineError {
    match status {
        400 => PipelineError::InvalidRequest {
            message: body.to_string(),
        },
        404 => PipelineError::NotFound {
            url: url.to_string(),
        },
        429 => PipelineError::RateLimited {
            message: body.to_string(),
        },
        500..=599 => PipelineError::ServerError {
            status,
            message: body.to_string(),
        },
        _ => PipelineError::HttpStatus {
            status,
            body: body.to_string(),
        },
    }
}

/// Render an error with its full source chain.
///
/// reqwest's top-level message ("error sending request for url ...") hides
/// the actual cause, e.g. "Connection refused (os error 111)".
pub fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
