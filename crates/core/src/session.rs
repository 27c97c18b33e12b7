//! Session State Machine
//!
//! Deterministic fold of [`PipelineEvent`]s into a per-turn [`SessionState`].
//! A state is created fresh for each turn, advanced only through
//! [`SessionState::apply`], and handed to the rendering layer as an
//! immutable snapshot after every step.

use std::sync::OnceLock;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;

use crate::risk::RiskReport;
use crate::stages::{FETCH_EXTERNAL_DATA, INIT_RISK};
use crate::streaming::PipelineEvent;

/// Reply shown when a `final` event carries no assistant text.
pub const DEFAULT_FINAL_REPLY: &str = "Analysis complete.";

/// Terminal error shown when the backend sends an `error` without a message.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unknown error occurred";

// ============================================================================
// Stage records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Processing,
    Complete,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Processing => write!(f, "processing"),
            StageStatus::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct StageRecord {
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StageRecord {
    pub fn processing(message: Option<String>) -> Self {
        Self {
            status: StageStatus::Processing,
            message,
        }
    }

    pub fn complete(message: Option<String>) -> Self {
        Self {
            status: StageStatus::Complete,
            message,
        }
    }
}

/// Stage records keyed by stage id, iterated in first-seen order.
///
/// Stage sets differ per request (chat turns never reach `init_risk`), so
/// display order is insertion order rather than a fixed pipeline order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageMap {
    entries: Vec<(String, StageRecord)>,
}

impl StageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, stage: &str) -> Option<&StageRecord> {
        self.entries
            .iter()
            .find(|(id, _)| id == stage)
            .map(|(_, record)| record)
    }

    /// Insert a new stage at the end, or replace an existing record in place.
    pub fn upsert(&mut self, stage: &str, record: StageRecord) {
        match self.entries.iter_mut().find(|(id, _)| id == stage) {
            Some((_, existing)) => *existing = record,
            None => self.entries.push((stage.to_string(), record)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StageRecord)> {
        self.entries.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Serialize for StageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, record) in &self.entries {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

// ============================================================================
// Session state
// ============================================================================

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn has started yet
    #[default]
    Idle,
    /// Turn in flight, accepting events
    Active,
    /// `final`, `error` or `done` has been folded
    Settled,
}

/// Everything the rendering layer needs to draw one turn.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SessionState {
    phase: TurnPhase,
    stages: StageMap,
    status_messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    criticality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    final_reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    risk_report: Option<RiskReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    terminal_error: Option<String>,
}

impl SessionState {
    /// State before any turn has been sent.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Fresh state for a new turn: empty, and processing.
    pub fn begin_turn() -> Self {
        Self {
            phase: TurnPhase::Active,
            ..Self::default()
        }
    }

    /// Fold one event into the state, producing the next state.
    pub fn apply(mut self, event: &PipelineEvent) -> Self {
        match event {
            PipelineEvent::StageStart { stage, message } => {
                if stage.is_empty() {
                    tracing::debug!("Ignoring stage_start without a stage id");
                    return self;
                }
                self.stages
                    .upsert(stage, StageRecord::processing(message.clone()));

                if stage == INIT_RISK || stage == FETCH_EXTERNAL_DATA {
                    if let Some(company) = message.as_deref().and_then(extract_company) {
                        self.current_company = Some(company);
                    }
                }
            }
            PipelineEvent::StageComplete {
                stage,
                message,
                company_name,
                criticality,
            } => {
                if stage.is_empty() {
                    tracing::debug!("Ignoring stage_complete without a stage id");
                    return self;
                }
                self.stages
                    .upsert(stage, StageRecord::complete(message.clone()));

                if let Some(message) = message {
                    self.status_messages.push(message.clone());
                }

                if stage == INIT_RISK {
                    if let Some(company) = company_name {
                        self.current_company = Some(company.clone());
                    }
                    if let Some(criticality) = criticality {
                        self.criticality = Some(criticality.clone());
                    }
                }
            }
            PipelineEvent::Final {
                assistant_reply,
                mode,
                risk_report,
                company_name,
                criticality,
            } => {
                let reply = assistant_reply
                    .as_deref()
                    .filter(|r| !r.is_empty())
                    .unwrap_or(DEFAULT_FINAL_REPLY);
                self.final_reply = Some(reply.to_string());
                self.mode = mode.clone();
                if let Some(report) = risk_report {
                    self.risk_report = Some(report.clone());
                }
                if let Some(company) = company_name {
                    self.current_company = Some(company.clone());
                }
                if let Some(criticality) = criticality {
                    self.criticality = Some(criticality.clone());
                }
                self.phase = TurnPhase::Settled;
            }
            PipelineEvent::Error { message } => {
                let message = message
                    .as_deref()
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_ERROR_MESSAGE);
                self.terminal_error = Some(message.to_string());
                self.phase = TurnPhase::Settled;
                // No grace period on failure.
                self.stages.clear();
                self.status_messages.clear();
            }
            PipelineEvent::Done => {
                self.phase = TurnPhase::Settled;
            }
            PipelineEvent::Unknown => {
                tracing::debug!("Ignoring pipeline event of unknown type");
            }
        }
        self
    }

    /// Drop stage display after the post-`final` grace period.
    pub fn clear_stages(mut self) -> Self {
        self.stages.clear();
        self.status_messages.clear();
        self
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_processing(&self) -> bool {
        self.phase == TurnPhase::Active
    }

    pub fn stages(&self) -> &StageMap {
        &self.stages
    }

    pub fn status_messages(&self) -> &[String] {
        &self.status_messages
    }

    pub fn current_company(&self) -> Option<&str> {
        self.current_company.as_deref()
    }

    pub fn criticality(&self) -> Option<&str> {
        self.criticality.as_deref()
    }

    pub fn final_reply(&self) -> Option<&str> {
        self.final_reply.as_deref()
    }

    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    pub fn risk_report(&self) -> Option<&RiskReport> {
        self.risk_report.as_ref()
    }

    pub fn terminal_error(&self) -> Option<&str> {
        self.terminal_error.as_deref()
    }
}

/// Free-function form of [`SessionState::apply`].
pub fn fold(state: SessionState, event: &PipelineEvent) -> SessionState {
    state.apply(event)
}

/// Best-effort company extraction from messages like "Analyzing Tesla ...".
fn extract_company(message: &str) -> Option<String> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"(?i)Analyzing ([A-Za-z0-9_]+)").ok())
        .as_ref()?;
    pattern
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
