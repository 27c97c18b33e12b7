//! Storage Layer
//!
//! Handles data persistence: the JSON config file.

pub mod config;

pub use config::*;
