//! Terminal Presenter
//!
//! Turns `SessionState` snapshots into plain text lines for the CLI.
//! Snapshots arrive after every fold step, so `UpdatePrinter` only emits what
//! changed since the previous one.

use contract_risk_core::{stage_label, RiskReport, SessionState, StageRecord, StageStatus};
use contract_risk_pipeline::ContractFile;

use crate::models::transcript::{ChatRole, Transcript};

/// One stage as a display line.
pub fn stage_line(stage: &str, record: &StageRecord) -> String {
    let marker = match record.status {
        StageStatus::Processing => "…",
        StageStatus::Complete => "✓",
    };
    match &record.message {
        Some(message) if !message.is_empty() => {
            format!("  {} {}: {}", marker, stage_label(stage), message)
        }
        _ => format!("  {} {}", marker, stage_label(stage)),
    }
}

/// Summary lines for a risk report.
pub fn render_risk_report(report: &RiskReport) -> Vec<String> {
    let mut lines = Vec::new();

    let title = match report.company() {
        Some(company) => format!("Risk report: {}", company),
        None => "Risk report".to_string(),
    };
    lines.push(title);

    if let Some(error) = report.error() {
        lines.push(format!("  Report error: {}", error));
    }

    match &report.assessment {
        Some(assessment) => {
            lines.push(format!("  Financial risk:      {:.1}", assessment.financial_risk));
            lines.push(format!("  Security risk:       {:.1}", assessment.security_risk));
            lines.push(format!("  Reputation risk:     {:.1}", assessment.reputation_risk));
            lines.push(format!(
                "  Resilience strength: {:.1}",
                assessment.resilience_strength
            ));
            lines.push(format!("  Average risk:        {:.2}", assessment.average_risk()));
            if !assessment.is_on_scale() {
                lines.push("  (scores outside the 0-5 scale)".to_string());
            }
            lines.push(format!("  Recommendation: {}", assessment.recommendation()));
            for line in assessment.rationale_lines() {
                lines.push(format!("    - {}", line));
            }
        }
        None if report.error().is_none() => {
            lines.push("  No structured assessment".to_string());
        }
        None => {}
    }

    if let Some(generated_at) = report.generated_at() {
        lines.push(format!("  Generated at {}", generated_at));
    }

    lines
}

/// Prints only the parts of a snapshot that changed.
#[derive(Debug, Default)]
pub struct UpdatePrinter {
    last: SessionState,
}

impl UpdatePrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, state: &SessionState) -> Vec<String> {
        let mut lines = Vec::new();
        let prev = &self.last;

        let new_turn = state.is_processing() && !prev.is_processing();
        if new_turn {
            lines.push("Working...".to_string());
        }

        // Stages
        if prev.stages() != state.stages() {
            if state.stages().is_empty() {
                if !prev.stages().is_empty() && !new_turn {
                    lines.push("(stages cleared)".to_string());
                }
            } else {
                for (stage, record) in state.stages().iter() {
                    if new_turn || prev.stages().get(stage) != Some(record) {
                        lines.push(stage_line(stage, record));
                    }
                }
            }
        }

        // Status messages are append-only within a turn
        let seen = if new_turn { 0 } else { prev.status_messages().len() };
        for message in state.status_messages().iter().skip(seen) {
            lines.push(format!("  > {}", message));
        }

        if state.current_company().is_some() && state.current_company() != prev.current_company()
        {
            let company = state.current_company().unwrap_or_default();
            match state.criticality() {
                Some(criticality) => {
                    lines.push(format!("Company: {} ({} criticality)", company, criticality))
                }
                None => lines.push(format!("Company: {}", company)),
            }
        }

        if let Some(reply) = state.final_reply() {
            if prev.final_reply() != Some(reply) || new_turn {
                lines.push(String::new());
                lines.push(reply.to_string());
                if let Some(report) = state.risk_report() {
                    lines.push(String::new());
                    lines.extend(render_risk_report(report));
                }
            }
        }

        if let Some(error) = state.terminal_error() {
            if prev.terminal_error() != Some(error) {
                lines.push(format!("Error: {}", error));
            }
        }

        self.last = state.clone();
        lines
    }
}

pub fn render_transcript(transcript: &Transcript) -> Vec<String> {
    if transcript.is_empty() {
        return vec!["(no messages yet)".to_string()];
    }
    transcript
        .messages()
        .iter()
        .map(|message| {
            let who = match message.role {
                ChatRole::User => "you",
                ChatRole::Assistant => "assistant",
            };
            format!(
                "[{}] {}: {}",
                message.created_at.format("%H:%M:%S"),
                who,
                message.content
            )
        })
        .collect()
}

pub fn render_files(files: &[ContractFile]) -> Vec<String> {
    if files.is_empty() {
        return vec!["No contract files found".to_string()];
    }
    files
        .iter()
        .map(|file| {
            let mut line = file.name.clone();
            if let Some(size) = file.size {
                line.push_str(&format!("  {} bytes", size));
            }
            if let Some(modified) = &file.last_modified {
                line.push_str(&format!("  {}", modified));
            }
            line
        })
        .collect()
}
