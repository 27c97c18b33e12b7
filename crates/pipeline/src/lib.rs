//! Contract Risk Pipeline
//!
//! Client side of the risk-analysis pipeline backend:
//! - `adapter` - `data: <json>` line format
//! - `decoder` - chunked bytes to pipeline events
//! - `transport` - the chat request and its streamed response
//! - `files` - contract file listing
//!
//! Also includes the HTTP client factory and transport error types.

pub mod adapter;
pub mod decoder;
pub mod error;
pub mod files;
pub mod http_client;
pub mod transport;

// Re-export main types
pub use adapter::EventStreamAdapter;
pub use decoder::{decode_stream, DecoderStats, EventDecoder};
pub use error::{parse_http_error, PipelineError, PipelineResult};
pub use files::{ContractFile, FileListingClient};
pub use http_client::{build_http_client, endpoint_url};
pub use transport::{ByteStream, ChatRequest, HttpPipelineTransport, PipelineTransport};
