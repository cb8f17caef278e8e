// ABOUTME: Events sent to the client while a reply streams
// ABOUTME: Tagged chunk/done/error variants that keep the legacy text/done/conversationTitle fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use serde::{Deserialize, Serialize};

/// Text of the terminal event when generation fails mid-stream
pub const STREAM_ERROR_TEXT: &str = "Sorry, something went wrong while generating a reply.";

/// Event variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEventKind {
    /// A text fragment
    Chunk,
    /// Normal completion
    Done,
    /// Generation failed
    Error,
}

/// One event on the response stream
///
/// Exactly one event per stream has `done = true`, and it is the last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// Variant tag
    #[serde(rename = "type")]
    pub kind: StreamEventKind,
    /// Fragment, empty on `done`, error text on `error`
    pub text: String,
    /// Terminal flag
    pub done: bool,
    /// Nickname, sent at most once on a chunk and again on `done`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_title: Option<String>,
}

impl StreamEvent {
    /// Text fragment
    #[must_use]
    pub fn chunk(text: impl Into<String>, conversation_title: Option<String>) -> Self {
        Self {
            kind: StreamEventKind::Chunk,
            text: text.into(),
            done: false,
            conversation_title,
        }
    }

    /// Normal terminal event
    #[must_use]
    pub const fn done(conversation_title: Option<String>) -> Self {
        Self {
            kind: StreamEventKind::Done,
            text: String::new(),
            done: true,
            conversation_title,
        }
    }

    /// Failure terminal event
    #[must_use]
    pub fn error() -> Self {
        Self {
            kind: StreamEventKind::Error,
            text: STREAM_ERROR_TEXT.to_owned(),
            done: true,
            conversation_title: None,
        }
    }

    /// Whether this event ends the stream
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_wire_shape() {
        let json = serde_json::to_value(StreamEvent::chunk("Hey", Some("Sunny".to_owned()))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "chunk", "text": "Hey", "done": false, "conversationTitle": "Sunny"})
        );
    }

    #[test]
    fn test_done_and_error_are_terminal() {
        let done = serde_json::to_value(StreamEvent::done(None)).unwrap();
        assert_eq!(done, serde_json::json!({"type": "done", "text": "", "done": true}));
        assert!(StreamEvent::error().is_terminal());
        assert_eq!(StreamEvent::error().kind, StreamEventKind::Error);
    }
}
