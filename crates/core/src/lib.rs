//! Contract Risk Core
//!
//! Domain types shared by the contract risk workspace. This crate has no
//! knowledge of HTTP, configuration files or terminals.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `streaming` - Wire events emitted by the pipeline backend and the line adapter trait
//! - `risk` - Risk report, assessment scores and recommendation classification
//! - `session` - Per-turn session state and the event fold
//! - `stages` - Known pipeline stage ids and display labels
//! - `proxy` - Proxy configuration data types

pub mod error;
pub mod proxy;
pub mod risk;
pub mod session;
pub mod stages;
pub mod streaming;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Streaming Types ────────────────────────────────────────────────────
pub use streaming::{AdapterError, PipelineEvent, StreamAdapter};

// ── Risk Report ────────────────────────────────────────────────────────
pub use risk::{Recommendation, RiskAssessment, RiskReport};

// ── Session State Machine ──────────────────────────────────────────────
pub use session::{fold, SessionState, StageMap, StageRecord, StageStatus, TurnPhase};

// ── Stage Catalog ──────────────────────────────────────────────────────
pub use stages::{is_known_stage, stage_label};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
