//! Chat Commands
//!
//! Entry points for sending messages and reading the conversation.

use tokio::sync::mpsc;

use contract_risk_core::SessionState;

use crate::models::response::{CommandResponse, TurnResponse};
use crate::models::transcript::Transcript;
use crate::services::session_controller::{IgnoreReason, SendOutcome};
use crate::state::AppState;

/// Send one user message and run the resulting turn to completion.
///
/// Snapshots are published to `updates` while the turn runs, including the
/// stage clear that follows a successful `final` after the configured grace.
pub async fn send_message(
    state: &AppState,
    message: &str,
    updates: &mpsc::Sender<SessionState>,
) -> CommandResponse<TurnResponse> {
    let controller = state.controller();
    match controller.send(state.user_id(), message, updates).await {
        Ok(SendOutcome::Completed { turn, state }) => CommandResponse::ok(TurnResponse {
            turn: Some(turn),
            ignored: None,
            state: Some(state),
        }),
        Ok(SendOutcome::Ignored(reason)) => {
            let reason = match reason {
                IgnoreReason::EmptyMessage => "empty_message",
                IgnoreReason::TurnInFlight => "turn_in_flight",
            };
            CommandResponse::ok(TurnResponse {
                turn: None,
                ignored: Some(reason.to_string()),
                state: None,
            })
        }
        Err(e) => CommandResponse::err(e.to_string()),
    }
}

/// Conversation history so far.
pub async fn get_transcript(state: &AppState) -> CommandResponse<Transcript> {
    CommandResponse::ok(state.controller().transcript().await)
}
