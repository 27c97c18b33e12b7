//! Response Types
//!
//! Envelope used by every command when output is requested as JSON.

use serde::{Deserialize, Serialize};

use contract_risk_core::SessionState;

/// Generic command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> CommandResponse<T> {
    /// Create a successful response with data
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response with message
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, crate::utils::error::AppError>> for CommandResponse<T> {
    fn from(result: Result<T, crate::utils::error::AppError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Outcome of one chat message, as reported by the `chat` command.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResponse {
    /// Turn number, absent when the message was ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<u64>,
    /// "empty_message" or "turn_in_flight" when ignored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionState>,
}
