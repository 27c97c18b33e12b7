//! Data Models
//!
//! Contains the data structures used throughout the application.

pub mod response;
pub mod settings;
pub mod transcript;

pub use response::*;
pub use settings::*;
pub use transcript::*;
