//! Pipeline Transport
//!
//! Opens one chat request against the pipeline backend and hands back the
//! raw response body as a byte stream. The trait is the seam the session
//! controller is tested through.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use contract_risk_core::proxy::ProxyConfig;

use crate::error::{parse_http_error, PipelineError, PipelineResult};
use crate::http_client::{build_http_client, endpoint_url};

/// Chunked response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = PipelineResult<Bytes>> + Send>>;

/// Request body posted to the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: String,
    pub user_message: String,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_message: user_message.into(),
        }
    }
}

/// Something that can open a streamed pipeline run.
#[async_trait]
pub trait PipelineTransport: Send + Sync {
    /// Where requests go, for logs and user-facing hints.
    fn endpoint(&self) -> &str;

    /// Post the request and return the response body.
    ///
    /// Fails for connection errors and non-success statuses; read errors
    /// after that surface as `Err` items inside the stream.
    async fn open(&self, request: &ChatRequest) -> PipelineResult<ByteStream>;
}

/// reqwest-backed transport for the real backend.
#[derive(Debug, Clone)]
pub struct HttpPipelineTransport {
    client: reqwest::Client,
    chat_url: String,
}

impl HttpPipelineTransport {
    pub fn new(client: reqwest::Client, chat_url: impl Into<String>) -> Self {
        Self {
            client,
            chat_url: chat_url.into(),
        }
    }

    /// Build the client and endpoint from backend settings.
    pub fn from_settings(
        backend_url: &str,
        chat_path: &str,
        proxy: Option<&ProxyConfig>,
        timeout: Option<Duration>,
    ) -> PipelineResult<Self> {
        let client = build_http_client(proxy, timeout)?;
        let chat_url = endpoint_url(backend_url, chat_path)?;
        tracing::info!("Pipeline transport initialized: url={}", chat_url);
        Ok(Self::new(client, chat_url))
    }
}

#[async_trait]
impl PipelineTransport for HttpPipelineTransport {
    fn endpoint(&self) -> &str {
        &self.chat_url
    }

    async fn open(&self, request: &ChatRequest) -> PipelineResult<ByteStream> {
        tracing::debug!("Pipeline chat POST {}", self.chat_url);

        let response = self
            .client
            .post(&self.chat_url)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| PipelineError::network(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Pipeline chat returned HTTP {}: {}", status.as_u16(), body);
            return Err(parse_http_error(status.as_u16(), &body, &self.chat_url));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| PipelineError::stream(&e)));
        Ok(body.boxed())
    }
}
