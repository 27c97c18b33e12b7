//! Session Controller Integration Tests
//!
//! Drives whole turns through `SessionController` against an in-memory
//! transport:
//! - Successful risk turns, chunked at awkward boundaries
//! - Transport failures before and during the body
//! - Rejection of concurrent and empty sends
//! - Grace-period stage clearing and its interaction with newer turns

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::json;

use contract_risk_assistant::models::transcript::ChatRole;
use contract_risk_assistant::services::session_controller::{
    IgnoreReason, SendOutcome, SessionController,
};
use contract_risk_assistant::utils::error::AppError;
use contract_risk_core::{StageStatus, TurnPhase};
use contract_risk_pipeline::{parse_http_error, HttpPipelineTransport, PipelineError};

use crate::support::{
    chunks, controller_with, drain, line, live_reply, single, updates, Reply,
    ScriptedTransport, TEST_ENDPOINT,
};

const USER: &str = "user_1700000000000";

fn risk_turn_body() -> String {
    [
        line(json!({"type": "stage_start", "stage": "classify_question", "message": "Classifying request"})),
        line(json!({"type": "stage_complete", "stage": "classify_question", "message": "Risk analysis requested"})),
        line(json!({"type": "stage_start", "stage": "init_risk", "message": "Analyzing Tesla with high criticality"})),
        line(json!({"type": "stage_complete", "stage": "init_risk", "message": "Company identified", "company_name": "Tesla, Inc.", "criticality": "high"})),
        line(json!({"type": "stage_start", "stage": "fetch_external_data"})),
        line(json!({"type": "stage_complete", "stage": "fetch_external_data", "message": "Fetched 12 sources"})),
        line(json!({
            "type": "final",
            "assistant_reply": "Done.",
            "mode": "risk_report",
            "risk_report": {
                "company": "Tesla, Inc.",
                "assessment": {
                    "financial_risk": 3,
                    "security_risk": 2,
                    "reputation_risk": 1,
                    "resilience_strength": 4,
                    "overall_recommendation": "proceed_with_caution"
                }
            }
        })),
        line(json!({"type": "done"})),
    ]
    .concat()
}

fn completed(outcome: SendOutcome) -> (u64, contract_risk_core::SessionState) {
    match outcome {
        SendOutcome::Completed { turn, state } => (turn, state),
        other => panic!("expected a completed turn, got {:?}", other),
    }
}

// ============================================================================
// Successful turns
// ============================================================================

#[tokio::test]
async fn test_risk_turn_end_to_end() {
    let body = risk_turn_body();
    // Split in three places, one of them inside a JSON payload
    let (a, rest) = body.split_at(37);
    let (b, c) = rest.split_at(rest.len() / 2);
    let transport = ScriptedTransport::new(vec![chunks(&[a, b, c])]);
    let controller = controller_with(transport.clone());
    let (tx, mut rx) = updates();

    let outcome = controller
        .send(USER, "Analyze Tesla with high criticality", &tx)
        .await
        .unwrap();
    let (turn, state) = completed(outcome);

    assert_eq!(turn, 1);
    assert!(!state.is_processing());
    assert_eq!(state.phase(), TurnPhase::Settled);
    assert_eq!(state.final_reply(), Some("Done."));
    assert_eq!(state.mode(), Some("risk_report"));
    assert_eq!(state.current_company(), Some("Tesla, Inc."));
    assert_eq!(state.criticality(), Some("high"));
    assert_eq!(
        state.stages().ids(),
        vec!["classify_question", "init_risk", "fetch_external_data"]
    );
    assert!(state
        .stages()
        .iter()
        .all(|(_, record)| record.status == StageStatus::Complete));
    assert_eq!(
        state.status_messages(),
        &[
            "Risk analysis requested".to_string(),
            "Company identified".to_string(),
            "Fetched 12 sources".to_string()
        ]
    );
    let assessment = state.risk_report().unwrap().assessment.as_ref().unwrap();
    assert_eq!(assessment.financial_risk, 3.0);
    assert!(state.terminal_error().is_none());

    // The request carried the conversation id and the raw message
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_id, USER);
    assert_eq!(requests[0].user_message, "Analyze Tesla with high criticality");

    // One snapshot for the new turn, one per event
    let snapshots = drain(&mut rx);
    assert_eq!(snapshots.len(), 9);
    assert!(snapshots[0].is_processing());
    assert!(snapshots[0].stages().is_empty());
    assert_eq!(snapshots.last().unwrap(), &state);
    assert_eq!(controller.snapshot().await, state);

    let transcript = controller.transcript().await;
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[0].role, ChatRole::User);
    let reply = transcript.last().unwrap();
    assert_eq!(reply.role, ChatRole::Assistant);
    assert_eq!(reply.content, "Done.");
    assert_eq!(reply.mode.as_deref(), Some("risk_report"));
}

#[tokio::test]
async fn test_company_from_stage_message() {
    let body = line(json!({
        "type": "stage_start", "stage": "init_risk", "message": "Analyzing Tesla with high criticality"
    }));
    let (reply, feed) = live_reply();
    feed.send(&body);
    feed.close();
    let transport = ScriptedTransport::new(vec![reply]);
    let controller = controller_with(transport);
    let (tx, mut rx) = updates();

    let (_, state) = completed(controller.send(USER, "Analyze Tesla", &tx).await.unwrap());

    let snapshots = drain(&mut rx);
    let after_start = &snapshots[1];
    assert_eq!(after_start.current_company(), Some("Tesla"));
    assert_eq!(
        after_start.stages().get("init_risk").unwrap().status,
        StageStatus::Processing
    );
    // The stream ended without a terminal event
    assert!(!state.is_processing());
}

#[tokio::test]
async fn test_stream_without_terminal_event_settles() {
    let body = line(json!({"type": "stage_start", "stage": "classify_question"}));
    let transport = ScriptedTransport::new(vec![chunks(&[body.as_str(), "data: {\"type\":\"stage_sta"])]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "hello", &tx).await.unwrap());

    assert!(!state.is_processing());
    assert!(state.final_reply().is_none());
    assert!(state.risk_report().is_none());
    assert!(state.terminal_error().is_none());
    assert_eq!(
        state.stages().get("classify_question").unwrap().status,
        StageStatus::Processing
    );
}

#[tokio::test]
async fn test_malformed_and_foreign_lines_are_skipped() {
    let body = [
        ": keep-alive\n".to_string(),
        "data: {not json}\n".to_string(),
        "event: progress\n".to_string(),
        line(json!({"type": "heartbeat"})),
        line(json!({"type": "final", "assistant_reply": ""})),
    ]
    .concat();
    let transport = ScriptedTransport::new(vec![single(&body)]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "hi", &tx).await.unwrap());

    assert_eq!(state.final_reply(), Some("Analysis complete."));
    assert!(state.terminal_error().is_none());
}

#[tokio::test]
async fn test_backend_error_event() {
    let body = [
        line(json!({"type": "stage_start", "stage": "init_risk"})),
        line(json!({"type": "error", "message": "Company not found"})),
    ]
    .concat();
    let transport = ScriptedTransport::new(vec![single(&body)]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "Analyze Nobody Corp", &tx).await.unwrap());

    assert_eq!(state.terminal_error(), Some("Company not found"));
    assert!(!state.is_processing());
    assert!(state.stages().is_empty());
    assert_eq!(
        controller.transcript().await.last().unwrap().content,
        "Error: Company not found"
    );
}

#[tokio::test]
async fn test_mistyped_optional_fields_still_settle() {
    let reply = [
        line(json!({"type": "stage_start", "stage": "init_risk"})),
        line(json!({"type": "final", "assistant_reply": "Done.", "risk_report": "n/a", "criticality": 3})),
    ]
    .concat();
    let failure = line(json!({"type": "error", "message": null}));
    let transport = ScriptedTransport::new(vec![single(&reply), single(&failure)]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "Analyze Tesla", &tx).await.unwrap());
    assert_eq!(state.final_reply(), Some("Done."));
    assert!(state.risk_report().is_none());
    assert!(state.terminal_error().is_none());
    assert!(!state.is_processing());

    let (_, state) = completed(controller.send(USER, "Analyze Tesla", &tx).await.unwrap());
    assert_eq!(state.terminal_error(), Some("Unknown error occurred"));
    assert!(!state.is_processing());
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn test_connection_refused_before_any_bytes() {
    let transport = ScriptedTransport::new(vec![Reply::Fail(PipelineError::NetworkError {
        message: "connection refused".to_string(),
    })]);
    let controller = controller_with(transport);
    let (tx, mut rx) = updates();

    let (_, state) = completed(controller.send(USER, "hello", &tx).await.unwrap());

    let error = state.terminal_error().unwrap();
    assert!(error.contains("connection refused"));
    assert!(error.starts_with("Connection error:"));
    assert!(!state.is_processing());
    assert!(state.stages().is_empty());

    // Initial snapshot plus the synthesized error
    let snapshots = drain(&mut rx);
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[1], state);

    let hint = controller.transcript().await.last().unwrap().content.clone();
    assert!(hint.contains("connection refused"));
    assert!(hint.contains(TEST_ENDPOINT));
}

#[tokio::test]
async fn test_real_connection_refused() {
    // Nothing listens on the discard port
    let transport =
        HttpPipelineTransport::from_settings("http://127.0.0.1:9", "/chat", None, None).unwrap();
    let controller = Arc::new(SessionController::new(Arc::new(transport)));
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "hello", &tx).await.unwrap());

    let error = state.terminal_error().unwrap().to_lowercase();
    assert!(error.contains("connection refused"), "{}", error);
    assert!(!state.is_processing());
}

#[tokio::test]
async fn test_http_status_failure() {
    let transport = ScriptedTransport::new(vec![Reply::Fail(parse_http_error(
        503,
        "upstream down",
        TEST_ENDPOINT,
    ))]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "hello", &tx).await.unwrap());

    assert!(state.terminal_error().unwrap().contains("503"));
    assert!(!state.is_processing());
}

#[tokio::test]
async fn test_stream_read_error_mid_turn() {
    let first = line(json!({"type": "stage_start", "stage": "fetch_external_data"}));
    let transport = ScriptedTransport::new(vec![Reply::Chunks(vec![
        Ok(Bytes::from(first)),
        Err(PipelineError::StreamError {
            message: "connection reset by peer".to_string(),
        }),
        Ok(Bytes::from(line(json!({"type": "final", "assistant_reply": "late"})))),
    ])]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (_, state) = completed(controller.send(USER, "hello", &tx).await.unwrap());

    assert!(state.terminal_error().unwrap().contains("connection reset by peer"));
    assert!(state.final_reply().is_none());
    assert!(state.stages().is_empty());
    assert!(!state.is_processing());
}

// ============================================================================
// Rejected sends
// ============================================================================

#[tokio::test]
async fn test_send_while_processing_is_a_noop() {
    let (reply, feed) = live_reply();
    let transport = ScriptedTransport::new(vec![reply, chunks(&[])]);
    let controller = controller_with(transport.clone());
    let (tx, mut rx) = updates();

    let first = {
        let controller = controller.clone();
        let tx = tx.clone();
        tokio::spawn(async move { controller.send(USER, "Analyze Tesla", &tx).await })
    };

    // Wait for the turn to start and absorb one event
    assert!(rx.recv().await.unwrap().is_processing());
    feed.send(&line(json!({"type": "stage_start", "stage": "init_risk"})));
    let in_flight = rx.recv().await.unwrap();
    assert!(in_flight.is_processing());

    let second = controller.send(USER, "Analyze Ford", &tx).await.unwrap();
    assert_eq!(second, SendOutcome::Ignored(IgnoreReason::TurnInFlight));
    assert_eq!(transport.calls(), 1);
    assert_eq!(controller.snapshot().await, in_flight);
    assert_eq!(controller.current_turn().await, 1);
    assert!(rx.try_recv().is_err());

    feed.send(&line(json!({"type": "final", "assistant_reply": "Done."})));
    feed.close();
    let (turn, state) = completed(first.await.unwrap().unwrap());
    assert_eq!(turn, 1);
    assert_eq!(state.final_reply(), Some("Done."));

    // Settled: the next send goes through
    let (turn, _) = completed(controller.send(USER, "Analyze Ford", &tx).await.unwrap());
    assert_eq!(turn, 2);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_empty_message_is_ignored() {
    let transport = ScriptedTransport::new(vec![]);
    let controller = controller_with(transport.clone());
    let (tx, mut rx) = updates();

    let outcome = controller.send(USER, "   \n", &tx).await.unwrap();
    assert_eq!(outcome, SendOutcome::Ignored(IgnoreReason::EmptyMessage));
    assert_eq!(transport.calls(), 0);
    assert!(rx.try_recv().is_err());
    assert!(controller.transcript().await.is_empty());
    assert_eq!(controller.snapshot().await.phase(), TurnPhase::Idle);
}

#[tokio::test]
async fn test_empty_conversation_id_is_an_error() {
    let transport = ScriptedTransport::new(vec![]);
    let controller = controller_with(transport.clone());
    let (tx, _rx) = updates();

    let result = controller.send("", "hello", &tx).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(transport.calls(), 0);
}

// ============================================================================
// Grace-period clearing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_clear_after_grace_period() {
    let transport = ScriptedTransport::new(vec![single(risk_turn_body())]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (turn, state) = completed(controller.send(USER, "Analyze Tesla", &tx).await.unwrap());
    assert_eq!(state.stages().len(), 3);

    let started = tokio::time::Instant::now();
    let cleared = controller
        .clear_stages_after(turn, Duration::from_millis(2000))
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));

    assert!(cleared.stages().is_empty());
    assert!(cleared.status_messages().is_empty());
    assert_eq!(cleared.final_reply(), Some("Done."));
    assert!(cleared.risk_report().is_some());
    assert_eq!(controller.snapshot().await, cleared);
}

#[tokio::test(start_paused = true)]
async fn test_stage_clear_scheduled_at_final() {
    let (reply, feed) = live_reply();
    let transport = ScriptedTransport::new(vec![reply]);
    let controller = Arc::new(
        SessionController::new(transport).with_stage_clear_grace(Duration::from_millis(2000)),
    );
    let (tx, mut rx) = updates();

    let send = {
        let controller = controller.clone();
        let tx = tx.clone();
        tokio::spawn(async move { controller.send(USER, "Analyze Tesla", &tx).await })
    };
    assert!(rx.recv().await.unwrap().is_processing());

    feed.send(&line(json!({"type": "stage_start", "stage": "init_risk"})));
    feed.send(&line(json!({"type": "final", "assistant_reply": "Done.", "mode": "chat"})));
    rx.recv().await.unwrap();
    let settled = rx.recv().await.unwrap();
    assert_eq!(settled.final_reply(), Some("Done."));
    assert_eq!(settled.stages().len(), 1);

    // Body is still open when the grace period runs out
    let started = tokio::time::Instant::now();
    let cleared = rx.recv().await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(2000));
    assert!(cleared.stages().is_empty());
    assert_eq!(cleared.final_reply(), Some("Done."));
    assert!(!send.is_finished());

    feed.close();
    let (turn, state) = completed(send.await.unwrap().unwrap());
    assert_eq!(turn, 1);
    assert!(state.stages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_final_schedules_no_clear() {
    let transport = ScriptedTransport::new(vec![single(
        [
            line(json!({"type": "stage_start", "stage": "init_risk"})),
            line(json!({"type": "error", "message": "LLM quota exceeded"})),
        ]
        .concat(),
    )]);
    let controller = Arc::new(
        SessionController::new(transport).with_stage_clear_grace(Duration::from_millis(10)),
    );
    let (tx, mut rx) = updates();

    completed(controller.send(USER, "Analyze Tesla", &tx).await.unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let published = drain(&mut rx);
    assert_eq!(published.len(), 3);
    assert!(published[2].terminal_error().is_some());
}

#[tokio::test]
async fn test_failed_turn_is_not_cleared() {
    let transport = ScriptedTransport::new(vec![Reply::Fail(PipelineError::NetworkError {
        message: "connection refused".to_string(),
    })]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    let (turn, _) = completed(controller.send(USER, "hello", &tx).await.unwrap());
    assert!(controller.clear_stages(turn).await.is_none());
    assert!(controller.clear_stages(turn + 1).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_new_turn_wins_over_pending_clear() {
    let (reply, feed) = live_reply();
    let transport = ScriptedTransport::new(vec![single(risk_turn_body()), reply]);
    let controller = controller_with(transport);
    let (tx, mut rx) = updates();

    let (turn, _) = completed(controller.send(USER, "Analyze Tesla", &tx).await.unwrap());
    drain(&mut rx);

    let pending_clear = {
        let controller = controller.clone();
        tokio::spawn(async move {
            controller
                .clear_stages_after(turn, Duration::from_millis(2000))
                .await
        })
    };

    let second = {
        let controller = controller.clone();
        let tx = tx.clone();
        tokio::spawn(async move { controller.send(USER, "Analyze Ford", &tx).await })
    };
    assert!(rx.recv().await.unwrap().is_processing());
    feed.send(&line(json!({"type": "stage_start", "stage": "init_risk"})));
    let in_flight = rx.recv().await.unwrap();

    // Grace period elapses while turn 2 is running
    assert!(pending_clear.await.unwrap().is_none());
    assert_eq!(controller.snapshot().await, in_flight);
    assert_eq!(controller.snapshot().await.stages().len(), 1);

    feed.close();
    let (turn, state) = completed(second.await.unwrap().unwrap());
    assert_eq!(turn, 2);
    assert!(!state.is_processing());
}

#[tokio::test]
async fn test_transcript_spans_turns() {
    let transport = ScriptedTransport::new(vec![
        single(line(json!({"type": "final", "assistant_reply": "Hi there", "mode": "chat"}))),
        Reply::Fail(PipelineError::NetworkError {
            message: "connection refused".to_string(),
        }),
    ]);
    let controller = controller_with(transport);
    let (tx, _rx) = updates();

    controller.send(USER, "hello", &tx).await.unwrap();
    controller.send(USER, "still there?", &tx).await.unwrap();

    let transcript = controller.transcript().await;
    let contents: Vec<&str> = transcript.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 4);
    assert_eq!(contents[0], "hello");
    assert_eq!(contents[1], "Hi there");
    assert_eq!(contents[2], "still there?");
    assert!(contents[3].starts_with("Connection error: "));
}
