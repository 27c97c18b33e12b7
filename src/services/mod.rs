//! Services
//!
//! Business logic services for the application.
//! Services handle the core functionality and are called by commands.

pub mod identity;
pub mod presenter;
pub mod session_controller;

pub use identity::{SessionIdentity, UserIdentity};
pub use presenter::UpdatePrinter;
pub use session_controller::{IgnoreReason, SendOutcome, SessionController, TurnId};
