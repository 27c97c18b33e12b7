//! Shared test doubles: an in-memory pipeline transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;

use contract_risk_assistant::services::session_controller::SessionController;
use contract_risk_core::SessionState;
use contract_risk_pipeline::{ByteStream, ChatRequest, PipelineError, PipelineResult, PipelineTransport};

pub const TEST_ENDPOINT: &str = "http://backend.test/chat";

/// What the transport does for one `open` call.
pub enum Reply {
    /// Body delivered as these chunks, then closed
    Chunks(Vec<PipelineResult<Bytes>>),
    /// `open` itself fails
    Fail(PipelineError),
    /// Body fed live by the test through a [`BodyFeed`]
    Live(mpsc::UnboundedReceiver<PipelineResult<Bytes>>),
}

/// Test-side handle of a `Reply::Live` body.
pub struct BodyFeed(mpsc::UnboundedSender<PipelineResult<Bytes>>);

impl BodyFeed {
    pub fn send(&self, chunk: &str) {
        let _ = self.0.send(Ok(Bytes::copy_from_slice(chunk.as_bytes())));
    }

    /// End the body.
    pub fn close(self) {}
}

pub fn live_reply() -> (Reply, BodyFeed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Reply::Live(rx), BodyFeed(tx))
}

pub fn chunks(parts: &[&str]) -> Reply {
    Reply::Chunks(
        parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p.as_bytes())))
            .collect(),
    )
}

/// Whole body in one chunk.
pub fn single(body: impl AsRef<str>) -> Reply {
    chunks(&[body.as_ref()])
}

/// Transport answering `open` calls from a queue of scripted replies.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineTransport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        TEST_ENDPOINT
    }

    async fn open(&self, request: &ChatRequest) -> PipelineResult<ByteStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Chunks(Vec::new()));

        match reply {
            Reply::Chunks(items) => Ok(stream::iter(items).boxed()),
            Reply::Fail(err) => Err(err),
            Reply::Live(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
        }
    }
}

pub fn controller_with(transport: Arc<ScriptedTransport>) -> Arc<SessionController> {
    Arc::new(SessionController::new(transport))
}

/// Channel whose receiver collects every published snapshot.
pub fn updates() -> (mpsc::Sender<SessionState>, mpsc::Receiver<SessionState>) {
    mpsc::channel(256)
}

pub fn drain(rx: &mut mpsc::Receiver<SessionState>) -> Vec<SessionState> {
    let mut out = Vec::new();
    while let Ok(state) = rx.try_recv() {
        out.push(state);
    }
    out
}

/// `data: <json>\n` line for one event.
pub fn line(json: serde_json::Value) -> String {
    format!("data: {}\n", json)
}
