//! Session Controller
//!
//! Drives one conversation turn end to end: opens the pipeline request,
//! decodes the streamed body, folds every event into the turn's
//! `SessionState`, and publishes a snapshot after each step.
//!
//! When a stage clear grace is set, a successful `final` schedules the stage
//! display to be cleared once the grace period has passed, independently of
//! when the stream itself ends.
//!
//! Expected failures (transport errors, backend `error` events, malformed
//! lines) never surface as `Err`; they end up in the state as data. Only
//! misuse of the controller itself is an error.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::{mpsc, RwLock};

use contract_risk_core::{PipelineEvent, SessionState};
use contract_risk_pipeline::{decode_stream, ByteStream, ChatRequest, PipelineError, PipelineTransport};

use crate::models::transcript::Transcript;
use crate::utils::error::{AppError, AppResult};

/// Monotonic turn counter; 0 means no turn has started.
pub type TurnId = u64;

/// Why a send request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Message was empty after trimming
    EmptyMessage,
    /// A turn is still processing
    TurnInFlight,
}

/// Result of a send request.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The turn ran to completion (successfully or not)
    Completed { turn: TurnId, state: SessionState },
    /// No transport activity and no state change
    Ignored(IgnoreReason),
}

impl SendOutcome {
    pub fn state(&self) -> Option<&SessionState> {
        match self {
            SendOutcome::Completed { state, .. } => Some(state),
            SendOutcome::Ignored(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct TurnSlot {
    turn: TurnId,
    state: SessionState,
}

/// Owns the current turn's state and the conversation transcript.
pub struct SessionController {
    transport: Arc<dyn PipelineTransport>,
    slot: RwLock<TurnSlot>,
    transcript: RwLock<Transcript>,
    stage_clear_grace: Option<Duration>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn PipelineTransport>) -> Self {
        Self {
            transport,
            slot: RwLock::new(TurnSlot::default()),
            transcript: RwLock::new(Transcript::new()),
            stage_clear_grace: None,
        }
    }

    /// Clear stage display `grace` after each successful `final` event.
    pub fn with_stage_clear_grace(mut self, grace: Duration) -> Self {
        self.stage_clear_grace = Some(grace);
        self
    }

    /// Latest published state.
    pub async fn snapshot(&self) -> SessionState {
        self.slot.read().await.state.clone()
    }

    pub async fn current_turn(&self) -> TurnId {
        self.slot.read().await.turn
    }

    pub async fn is_processing(&self) -> bool {
        self.slot.read().await.state.is_processing()
    }

    pub async fn transcript(&self) -> Transcript {
        self.transcript.read().await.clone()
    }

    /// Run one turn for `message`, publishing every snapshot to `tx`.
    ///
    /// Returns `Ignored` without touching the transport when the message is
    /// blank or another turn is still processing. Fails only when
    /// `conversation_id` is blank.
    pub async fn send(
        self: &Arc<Self>,
        conversation_id: &str,
        message: &str,
        tx: &mpsc::Sender<SessionState>,
    ) -> AppResult<SendOutcome> {
        if conversation_id.trim().is_empty() {
            return Err(AppError::validation(
                "send requires a non-empty conversation id",
            ));
        }
        if message.trim().is_empty() {
            return Ok(SendOutcome::Ignored(IgnoreReason::EmptyMessage));
        }

        let (turn, initial) = {
            let mut slot = self.slot.write().await;
            if slot.state.is_processing() {
                tracing::debug!("Ignoring send while turn {} is processing", slot.turn);
                return Ok(SendOutcome::Ignored(IgnoreReason::TurnInFlight));
            }
            slot.turn += 1;
            slot.state = SessionState::begin_turn();
            (slot.turn, slot.state.clone())
        };

        tracing::info!("Turn {} started for {}", turn, conversation_id);
        self.transcript.write().await.push_user(message);
        publish(tx, initial).await;

        let request = ChatRequest::new(conversation_id, message);
        let state = match self.transport.open(&request).await {
            Ok(body) => self.drive(turn, body, tx).await,
            Err(e) => self.fail(turn, e, tx).await,
        };

        tracing::info!(
            "Turn {} settled: reply={}, error={}",
            turn,
            state.final_reply().is_some(),
            state.terminal_error().is_some()
        );
        Ok(SendOutcome::Completed { turn, state })
    }

    /// Clear stage display for `turn` once its grace period has passed.
    ///
    /// A newer turn takes precedence: nothing happens unless `turn` is still
    /// current and has settled without error.
    pub async fn clear_stages(&self, turn: TurnId) -> Option<SessionState> {
        let mut slot = self.slot.write().await;
        if slot.turn != turn
            || slot.state.is_processing()
            || slot.state.terminal_error().is_some()
        {
            return None;
        }
        slot.state = std::mem::take(&mut slot.state).clear_stages();
        Some(slot.state.clone())
    }

    /// Sleep for `delay`, then [`clear_stages`](Self::clear_stages).
    pub async fn clear_stages_after(&self, turn: TurnId, delay: Duration) -> Option<SessionState> {
        tokio::time::sleep(delay).await;
        self.clear_stages(turn).await
    }

    async fn drive(
        self: &Arc<Self>,
        turn: TurnId,
        body: ByteStream,
        tx: &mpsc::Sender<SessionState>,
    ) -> SessionState {
        let mut events = Box::pin(decode_stream(body));
        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    if self.fold_and_publish(turn, &event, tx).await.is_none() {
                        tracing::debug!("Turn {} superseded, dropping rest of its stream", turn);
                        return self.snapshot().await;
                    }
                }
                Err(e) => return self.fail(turn, e, tx).await,
            }
        }

        let state = self.snapshot().await;
        if state.is_processing() {
            tracing::warn!("Turn {} stream ended without a terminal event", turn);
            if let Some(settled) = self.fold_and_publish(turn, &PipelineEvent::Done, tx).await {
                return settled;
            }
        }
        state
    }

    /// Turn a transport failure into a terminal `error` event.
    async fn fail(
        &self,
        turn: TurnId,
        err: PipelineError,
        tx: &mpsc::Sender<SessionState>,
    ) -> SessionState {
        tracing::warn!("Turn {} transport failure: {}", turn, err);
        self.transcript
            .write()
            .await
            .push_connection_error(&err.to_string(), self.transport.endpoint());

        let event = PipelineEvent::error(format!("Connection error: {}", err));
        match self.fold_state(turn, &event).await {
            Some(state) => {
                publish(tx, state.clone()).await;
                state
            }
            None => self.snapshot().await,
        }
    }

    async fn fold_and_publish(
        self: &Arc<Self>,
        turn: TurnId,
        event: &PipelineEvent,
        tx: &mpsc::Sender<SessionState>,
    ) -> Option<SessionState> {
        let state = self.fold_state(turn, event).await?;

        match event {
            PipelineEvent::Final { .. } => {
                let reply = state.final_reply().unwrap_or_default().to_string();
                self.transcript
                    .write()
                    .await
                    .push_assistant(reply, state.mode().map(str::to_string));
                if let Some(grace) = self.stage_clear_grace {
                    if state.terminal_error().is_none() {
                        self.schedule_stage_clear(turn, grace, tx);
                    }
                }
            }
            PipelineEvent::Error { .. } => {
                let message = state.terminal_error().unwrap_or_default().to_string();
                self.transcript.write().await.push_error(&message);
            }
            _ => {}
        }

        publish(tx, state.clone()).await;
        Some(state)
    }

    /// Publish the cleared snapshot once the grace period has passed, unless
    /// the view has gone away by then.
    fn schedule_stage_clear(
        self: &Arc<Self>,
        turn: TurnId,
        grace: Duration,
        tx: &mpsc::Sender<SessionState>,
    ) {
        let controller = Arc::clone(self);
        let tx = tx.downgrade();
        tokio::spawn(async move {
            let Some(cleared) = controller.clear_stages_after(turn, grace).await else {
                return;
            };
            tracing::debug!("Turn {} stage display cleared", turn);
            if let Some(tx) = tx.upgrade() {
                publish(&tx, cleared).await;
            }
        });
    }

    /// Fold under the lock; `None` if `turn` is no longer current.
    async fn fold_state(&self, turn: TurnId, event: &PipelineEvent) -> Option<SessionState> {
        let mut slot = self.slot.write().await;
        if slot.turn != turn {
            return None;
        }
        slot.state = std::mem::take(&mut slot.state).apply(event);
        Some(slot.state.clone())
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("endpoint", &self.transport.endpoint())
            .field("stage_clear_grace", &self.stage_clear_grace)
            .finish()
    }
}

async fn publish(tx: &mpsc::Sender<SessionState>, state: SessionState) {
    // A closed receiver means the view went away; the turn still runs out.
    let _ = tx.send(state).await;
}
