//! Event Decoder
//!
//! Turns a chunked byte stream into pipeline events. Chunks may split a line,
//! or a multi-byte character, anywhere; the decoder buffers raw bytes and only
//! decodes complete lines. `\n` never occurs inside a UTF-8 multi-byte
//! sequence, so splitting on the byte is safe.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};

use contract_risk_core::streaming::{PipelineEvent, StreamAdapter};

use crate::adapter::EventStreamAdapter;
use crate::error::PipelineResult;
use crate::transport::ByteStream;

/// Counters for one decoded stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Complete lines seen
    pub lines: usize,
    /// Events produced
    pub events: usize,
    /// Lines dropped because their payload failed to parse
    pub dropped: usize,
    /// Bytes discarded: an unterminated trailing line at end of stream, or
    /// an oversized line
    pub discarded_bytes: usize,
    /// Lines skipped for exceeding the line length cap
    pub oversized: usize,
}

/// Longest line the decoder buffers before giving up on it.
pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Incremental line decoder.
#[derive(Debug)]
pub struct EventDecoder<A: StreamAdapter = EventStreamAdapter> {
    adapter: A,
    buffer: Vec<u8>,
    /// Prefix of `buffer` already searched for a newline
    scanned: usize,
    /// Inside an oversized line; bytes are dropped up to the next newline
    skipping: bool,
    max_line_bytes: usize,
    stats: DecoderStats,
}

impl EventDecoder<EventStreamAdapter> {
    pub fn new() -> Self {
        Self::with_adapter(EventStreamAdapter::new())
    }
}

impl Default for EventDecoder<EventStreamAdapter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: StreamAdapter> EventDecoder<A> {
    pub fn with_adapter(adapter: A) -> Self {
        Self {
            adapter,
            buffer: Vec::new(),
            scanned: 0,
            skipping: false,
            max_line_bytes: MAX_LINE_BYTES,
            stats: DecoderStats::default(),
        }
    }

    /// Override the line length cap.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes.max(1);
        self
    }

    /// Feed one chunk; returns the events completed by it, in order.
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<PipelineEvent> {
        if self.skipping {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.stats.discarded_bytes += pos;
                    self.skipping = false;
                    chunk = &chunk[pos + 1..];
                }
                None => {
                    self.stats.discarded_bytes += chunk.len();
                    return Vec::new();
                }
            }
        }

        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.buffer[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            let line = String::from_utf8_lossy(&self.buffer[consumed..end]).into_owned();
            consumed = end + 1;
            search_from = consumed;
            self.decode_line(&line, &mut events);
        }
        self.buffer.drain(..consumed);
        self.scanned = self.buffer.len();

        if self.buffer.len() > self.max_line_bytes {
            tracing::warn!(
                "Skipping {} line longer than {} bytes",
                self.adapter.format_name(),
                self.max_line_bytes
            );
            self.stats.oversized += 1;
            self.stats.discarded_bytes += self.buffer.len();
            self.buffer.clear();
            self.scanned = 0;
            self.skipping = true;
        }

        events
    }

    /// End of stream: an unterminated trailing line is never an event.
    pub fn discard_remainder(&mut self) {
        if !self.buffer.is_empty() {
            tracing::debug!(
                "Discarding {} bytes of incomplete trailing line at end of stream",
                self.buffer.len()
            );
            self.stats.discarded_bytes += self.buffer.len();
            self.buffer.clear();
        }
        self.scanned = 0;
        self.skipping = false;
    }

    /// Finish decoding and return the stream counters.
    pub fn finish(mut self) -> DecoderStats {
        self.discard_remainder();
        self.stats
    }

    /// Bytes buffered while waiting for a newline.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Reset for a new stream.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.skipping = false;
        self.stats = DecoderStats::default();
        self.adapter.reset();
    }

    fn decode_line(&mut self, line: &str, out: &mut Vec<PipelineEvent>) {
        self.stats.lines += 1;
        match self.adapter.adapt(line) {
            Ok(events) => {
                for event in &events {
                    tracing::debug!("Pipeline event: {}", event.kind());
                }
                self.stats.events += events.len();
                out.extend(events);
            }
            Err(e) => {
                self.stats.dropped += 1;
                tracing::warn!(
                    "Dropping malformed {} line: {} ({})",
                    self.adapter.format_name(),
                    e,
                    line
                );
            }
        }
    }
}

/// Lazily decode a byte stream into events.
///
/// Yields `Err` at most once, for a transport failure, and ends right after.
/// The sequence cannot be restarted.
pub fn decode_stream(bytes: ByteStream) -> impl Stream<Item = PipelineResult<PipelineEvent>> + Send {
    struct State {
        bytes: ByteStream,
        decoder: EventDecoder,
        pending: VecDeque<PipelineEvent>,
        finished: bool,
    }

    let initial = State {
        bytes,
        decoder: EventDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(initial, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((Ok(event), st));
            }
            if st.finished {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => st.pending.extend(st.decoder.push(&chunk)),
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.finished = true;
                    st.decoder.discard_remainder();
                    let stats = st.decoder.stats();
                    tracing::debug!(
                        "Event stream ended: {} lines, {} events, {} dropped, {} oversized",
                        stats.lines,
                        stats.events,
                        stats.dropped,
                        stats.oversized
                    );
                }
            }
        }
    })
}
