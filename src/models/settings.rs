//! Settings Models
//!
//! Application configuration and settings data structures.

use std::time::Duration;

use contract_risk_core::ProxyConfig;
use serde::{Deserialize, Serialize};

/// Longest allowed post-`final` grace period.
pub const MAX_STAGE_CLEAR_GRACE_MS: u64 = 60_000;

/// Application configuration stored in config.json
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Base URL of the pipeline backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Path of the streaming chat endpoint
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Path of the contract file listing endpoint
    #[serde(default = "default_files_path")]
    pub files_path: String,
    /// Whole-request timeout in seconds, streamed body included (0 = none)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// How long stage display lingers after a final answer
    #[serde(default = "default_stage_clear_grace_ms")]
    pub stage_clear_grace_ms: u64,
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Outbound proxy; `None` connects directly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_chat_path() -> String {
    "/chat".to_string()
}

fn default_files_path() -> String {
    "/list_files".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_stage_clear_grace_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            chat_path: default_chat_path(),
            files_path: default_files_path(),
            request_timeout_secs: default_request_timeout_secs(),
            stage_clear_grace_ms: default_stage_clear_grace_ms(),
            log_level: default_log_level(),
            proxy: None,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub backend_url: Option<String>,
    pub chat_path: Option<String>,
    pub files_path: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub stage_clear_grace_ms: Option<u64>,
    pub log_level: Option<String>,
    pub proxy: Option<ProxyConfig>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(url) = update.backend_url {
            self.backend_url = url;
        }
        if let Some(path) = update.chat_path {
            self.chat_path = path;
        }
        if let Some(path) = update.files_path {
            self.files_path = path;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(ms) = update.stage_clear_grace_ms {
            self.stage_clear_grace_ms = ms;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
        if let Some(proxy) = update.proxy {
            self.proxy = Some(proxy);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.backend_url)
            .map_err(|e| format!("Invalid backend_url: {} ({})", self.backend_url, e))?;
        if !["http", "https"].contains(&url.scheme()) {
            return Err(format!(
                "Invalid backend_url scheme: {}. Must be 'http' or 'https'",
                url.scheme()
            ));
        }

        if self.chat_path.trim().is_empty() {
            return Err("chat_path cannot be empty".to_string());
        }
        if self.files_path.trim().is_empty() {
            return Err("files_path cannot be empty".to_string());
        }

        if self.stage_clear_grace_ms > MAX_STAGE_CLEAR_GRACE_MS {
            return Err(format!(
                "stage_clear_grace_ms cannot exceed {}",
                MAX_STAGE_CLEAR_GRACE_MS
            ));
        }

        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn stage_clear_grace(&self) -> Duration {
        Duration::from_millis(self.stage_clear_grace_ms)
    }
}
