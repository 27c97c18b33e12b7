//! Commands
//!
//! Entry points called by the CLI. Each wraps a service call in a
//! `CommandResponse` so it can be printed as text or JSON.

pub mod chat;
pub mod files;
pub mod settings;

pub use chat::*;
pub use files::*;
pub use settings::*;
