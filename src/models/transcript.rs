//! Conversation Transcript
//!
//! The chat history shown next to the pipeline progress. Unlike
//! `SessionState`, which is replaced every turn, the transcript spans the
//! whole conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Pipeline mode of an assistant reply ("chat", "risk_report", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatRole::User, content.into(), None);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, mode: Option<String>) {
        self.push(ChatRole::Assistant, content.into(), mode);
    }

    /// Backend-signaled failure.
    pub fn push_error(&mut self, message: &str) {
        self.push(ChatRole::Assistant, format!("Error: {}", message), None);
    }

    /// Transport failure, with a hint pointing at the backend.
    pub fn push_connection_error(&mut self, cause: &str, endpoint: &str) {
        self.push(
            ChatRole::Assistant,
            format!(
                "Connection error: {}\n\nPlease check if the backend is running on {}",
                cause, endpoint
            ),
            None,
        );
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, role: ChatRole, content: String, mode: Option<String>) {
        self.messages.push(ChatMessage {
            role,
            content,
            mode,
            created_at: Utc::now(),
        });
    }
}
