//! Pipeline Stream Event Types
//!
//! Wire events emitted by the risk-analysis pipeline backend, one JSON object
//! per `data: ` line, plus the adapter trait that turns a raw stream line into
//! zero or more events. Shared by the pipeline crate (decoding) and the
//! application crate (folding into session state).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::risk::RiskReport;

/// Pipeline event, discriminated by the `type` field.
///
/// Stage ids are an open set: any string is accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A pipeline stage has started
    StageStart {
        stage: String,
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        message: Option<String>,
    },

    /// A pipeline stage has finished
    StageComplete {
        stage: String,
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        message: Option<String>,
        /// Set by `init_risk` once the company has been extracted
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        company_name: Option<String>,
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        criticality: Option<String>,
    },

    /// Final answer for the turn
    Final {
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        assistant_reply: Option<String>,
        /// "chat", "risk_report", "clarification_needed", ...
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        mode: Option<String>,
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        risk_report: Option<RiskReport>,
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        company_name: Option<String>,
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        criticality: Option<String>,
    },

    /// Backend-signaled failure
    Error {
        #[serde(
            default,
            deserialize_with = "lenient_field",
            skip_serializing_if = "Option::is_none"
        )]
        message: Option<String>,
    },

    /// Stream finished
    Done,

    /// Any `type` this client does not know about
    #[serde(other)]
    Unknown,
}

impl PipelineEvent {
    /// Parse a single JSON payload (the part after `data: `).
    pub fn from_json(payload: &str) -> CoreResult<Self> {
        serde_json::from_str(payload).map_err(CoreError::from)
    }

    /// The wire `type` of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::StageStart { .. } => "stage_start",
            PipelineEvent::StageComplete { .. } => "stage_complete",
            PipelineEvent::Final { .. } => "final",
            PipelineEvent::Error { .. } => "error",
            PipelineEvent::Done => "done",
            PipelineEvent::Unknown => "unknown",
        }
    }

    /// Whether folding this event settles the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineEvent::Final { .. } | PipelineEvent::Error { .. } | PipelineEvent::Done
        )
    }

    pub fn error(message: impl Into<String>) -> Self {
        PipelineEvent::Error {
            message: Some(message.into()),
        }
    }
}

/// Optional field that reads as absent when its value has the wrong type.
///
/// One mistyped optional field must not cost the whole event.
fn lenient_field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value::<T>(value) {
        Ok(field) => Some(field),
        Err(e) => {
            tracing::debug!("Ignoring mistyped optional event field: {}", e);
            None
        }
    }))
}

/// Errors that can occur while adapting a single stream line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

impl From<CoreError> for AdapterError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Serialization(e) => AdapterError::ParseError(e.to_string()),
            other => AdapterError::InvalidFormat(other.to_string()),
        }
    }
}

/// Trait for adapting one complete stream line into pipeline events.
///
/// A single line may produce zero events (comments, keep-alives, non-data
/// fields) or one event. Errors are line-local; callers drop the line.
pub trait StreamAdapter: Send + Sync {
    /// Returns the wire format name for logging and identification.
    fn format_name(&self) -> &'static str;

    /// Adapt a complete line (without its trailing newline) to events.
    fn adapt(&mut self, line: &str) -> Result<Vec<PipelineEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {
        // Default implementation does nothing
    }
}
