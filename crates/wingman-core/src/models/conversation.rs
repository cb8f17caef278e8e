// ABOUTME: Conversation domain types shared by the pipeline and the record store
// ABOUTME: Stage, intent, history turns, persisted message and image records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Conversational phase the reply is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// First contact
    Opening,
    /// Ongoing exchange
    Continue,
    /// Reviving a stalled thread
    ReEngage,
}

impl Stage {
    /// All stages in canonical order
    pub const ALL: [Self; 3] = [Self::Opening, Self::Continue, Self::ReEngage];

    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "Opening",
            Self::Continue => "Continue",
            Self::ReEngage => "ReEngage",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    /// Exact, case-sensitive match against the three wire values
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("Invalid stage value: {s}"))
    }
}

/// Whether to draft new suggestions or refine the user's own draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    /// Produce fresh reply suggestions
    NewSuggestions,
    /// Polish a draft the user supplied
    RefineDraft,
}

impl Intent {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NewSuggestions => "NewSuggestions",
            Self::RefineDraft => "RefineDraft",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a history turn as sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The app user
    User,
    /// The assistant (stored as `ai` in the record store)
    #[serde(alias = "ai")]
    Assistant,
}

/// One element of the client-supplied conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    /// Who wrote the turn; clients send either `role` or `sender`
    #[serde(alias = "sender")]
    pub role: Role,
    /// Turn text
    #[serde(default)]
    pub content: String,
    /// Description of images attached to the turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_description: Option<String>,
}

impl ConversationTurn {
    /// Build a user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image_description: None,
        }
    }

    /// Build an assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image_description: None,
        }
    }

    /// Attach an image description
    #[must_use]
    pub fn with_image_description(mut self, description: impl Into<String>) -> Self {
        self.image_description = Some(description.into());
        self
    }
}

/// Sender column of a persisted message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Written by the app user
    User,
    /// Written by the assistant
    Ai,
}

impl Sender {
    /// Database representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Ai => "ai",
        }
    }
}

/// Persisted chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message ID, assigned once at creation
    pub id: String,
    /// Owning conversation
    pub conversation_id: String,
    /// Author
    pub sender: Sender,
    /// Text content; `None` for image-only user turns
    pub content: Option<String>,
    /// Description of attached images
    pub image_description: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// Image metadata to persist after a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Message the image belongs to
    pub message_id: String,
    /// Path inside the blob store
    pub storage_path: String,
    /// Original file name
    pub filename: String,
    /// MIME type of the stored bytes
    pub content_type: String,
    /// Stored size in bytes
    pub filesize: u64,
}
