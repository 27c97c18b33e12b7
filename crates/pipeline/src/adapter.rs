//! Event-Stream Line Adapter
//!
//! Handles the backend's `data: <json>` line format.

use contract_risk_core::streaming::{AdapterError, PipelineEvent, StreamAdapter};

/// Literal prefix that marks an event line.
pub const DATA_PREFIX: &str = "data: ";

/// Adapter for the pipeline's newline-delimited `data: ` format
#[derive(Debug, Default)]
pub struct EventStreamAdapter {
    /// Event lines seen since the last reset
    data_lines: usize,
}

impl EventStreamAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_lines(&self) -> usize {
        self.data_lines
    }
}

impl StreamAdapter for EventStreamAdapter {
    fn format_name(&self) -> &'static str {
        "event-stream"
    }

    fn adapt(&mut self, line: &str) -> Result<Vec<PipelineEvent>, AdapterError> {
        let line = line.trim_end_matches(['\r', '\n']);

        // Skip everything that is not an event line (event:, id:, comments, blanks)
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return Ok(vec![]);
        };
        self.data_lines += 1;

        if payload.trim() == "[DONE]" {
            return Ok(vec![]);
        }

        let event = PipelineEvent::from_json(payload)?;
        Ok(vec![event])
    }

    fn reset(&mut self) {
        self.data_lines = 0;
    }
}
