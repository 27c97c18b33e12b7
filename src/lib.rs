//! Contract Risk Assistant - Application Library
//!
//! Client for the contract risk-analysis pipeline. It includes:
//! - Command entry points used by the `contract-risk` CLI
//! - The session controller that drives one chat turn per message
//! - Storage layer (JSON config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::response::{CommandResponse, TurnResponse};
pub use models::settings::{AppConfig, SettingsUpdate};
pub use models::transcript::{ChatMessage, ChatRole, Transcript};
pub use services::session_controller::{IgnoreReason, SendOutcome, SessionController};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
