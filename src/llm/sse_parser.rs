// ABOUTME: Line-buffered parser for the SSE framing used by OpenAI-compatible streaming APIs
// ABOUTME: Reassembles lines split across TCP chunks and yields every event in a chunk
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # SSE Stream Parser
//!
//! Network chunks and SSE lines do not line up: one chunk may carry several
//! `data:` lines, and one JSON payload may be split across two chunks.
//! [`SseLineBuffer`] keeps the unterminated tail between `feed` calls, and
//! [`create_sse_stream`] turns a `reqwest` byte stream into a [`ChatStream`]
//! using a caller-supplied payload decoder.

use std::mem;

use async_stream::stream;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use super::{ChatStream, StreamChunk};
use crate::errors::AppError;

const DONE_SENTINEL: &str = "[DONE]";

/// A parsed SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line, prefix stripped
    Data(String),
    /// `data: [DONE]` terminator
    Done,
}

impl SseEvent {
    fn from_line(line: &str) -> Option<Self> {
        let payload = line.trim().strip_prefix("data:")?.trim();
        if payload.is_empty() {
            None
        } else if payload == DONE_SENTINEL {
            Some(Self::Done)
        } else {
            Some(Self::Data(payload.to_owned()))
        }
    }
}

/// Accumulates bytes until complete newline-terminated lines are available
///
/// Bytes are kept raw until a line is complete, so a multi-byte character
/// split across two network chunks decodes intact.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk and return every event completed by it
    ///
    /// Non-`data` fields (`event:`, `id:`, comments) are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let tail = self.pending.split_off(last_newline + 1);
        let complete = mem::replace(&mut self.pending, tail);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| SseEvent::from_line(&String::from_utf8_lossy(line)))
            .collect()
    }

    /// Parse whatever is left once the byte stream has ended
    pub fn flush(&mut self) -> Option<SseEvent> {
        SseEvent::from_line(&String::from_utf8_lossy(&mem::take(&mut self.pending)))
    }
}

fn final_chunk() -> StreamChunk {
    StreamChunk {
        delta: String::new(),
        is_final: true,
        finish_reason: Some("stop".to_owned()),
    }
}

/// Wrap a raw byte stream with SSE framing
///
/// `parse_data` decodes one `data:` payload; returning `None` skips it
/// (role-only or metadata deltas). Empty non-final deltas are dropped. A read
/// error ends the stream with a `ProviderError` item so callers learn the
/// stream was cut short.
pub fn create_sse_stream<S, F>(byte_stream: S, parse_data: F, provider_name: &'static str) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>> + Send + 'static,
{
    let decode = move |event: SseEvent| match event {
        SseEvent::Data(payload) => parse_data(&payload),
        SseEvent::Done => Some(Ok(final_chunk())),
    };

    let chunks = stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut buffer = SseLineBuffer::new();

        while let Some(next) = byte_stream.next().await {
            match next {
                Ok(bytes) => {
                    for event in buffer.feed(&bytes) {
                        if let Some(item) = decode(event) {
                            yield item;
                        }
                    }
                }
                Err(e) => {
                    yield Err(AppError::provider(provider_name, format!("Stream read error: {e}")));
                    return;
                }
            }
        }

        if let Some(item) = buffer.flush().and_then(&decode) {
            yield item;
        }
    };

    Box::pin(chunks.filter(|item| {
        let keep = item
            .as_ref()
            .map_or(true, |chunk| chunk.is_final || !chunk.delta.is_empty());
        futures_util::future::ready(keep)
    }))
}
