// ABOUTME: Inbound analysis payload and its validation
// ABOUTME: Parses history JSON, coerces the draft flag, resolves the stage and checks required fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use wingman_core::models::{ConversationTurn, Intent, Stage};

use super::classifier::{intent_for, resolve_stage};
use crate::errors::{AppError, AppResult};

/// Draft flag as clients send it: a JSON boolean or a form string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftFlag {
    /// JSON boolean
    Bool(bool),
    /// Form value; only `"true"` counts as true
    Text(String),
}

impl DraftFlag {
    /// Boolean coercion
    #[must_use]
    pub fn is_true(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Text(value) => value.trim() == "true",
        }
    }
}

/// An uploaded image as received
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Client file name
    pub filename: String,
    /// Declared MIME type
    pub content_type: String,
    /// Raw bytes
    pub bytes: Bytes,
}

/// Unvalidated analysis request
#[derive(Debug, Clone, Default)]
pub struct AnalysisPayload {
    /// JSON array of history turns
    pub history_json: Option<String>,
    /// Text of the turn being answered
    pub new_message_text: Option<String>,
    /// Target conversation
    pub conversation_id: Option<String>,
    /// Whether the text is the user's own draft
    pub is_draft: Option<DraftFlag>,
    /// Explicit stage
    pub stage: Option<String>,
    /// Attached images
    pub images: Vec<UploadedImage>,
}

/// Validated analysis request
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Parsed history
    pub history: Vec<ConversationTurn>,
    /// Raw message text, possibly empty when images are present
    pub new_message_text: String,
    /// Target conversation
    pub conversation_id: String,
    /// Draft flag
    pub is_draft: bool,
    /// Derived intent
    pub intent: Intent,
    /// Supplied or inferred stage
    pub stage: Stage,
    /// Attached images
    pub images: Vec<UploadedImage>,
}

impl AnalysisRequest {
    /// Whether the turn carries any text
    #[must_use]
    pub fn has_text(&self) -> bool {
        !self.new_message_text.trim().is_empty()
    }
}

/// Parse a history JSON array; missing or blank input is an empty history
///
/// # Errors
///
/// Returns a validation error for malformed JSON
pub fn parse_history(history_json: Option<&str>) -> AppResult<Vec<ConversationTurn>> {
    match history_json.map(str::trim).filter(|json| !json.is_empty()) {
        None => Ok(Vec::new()),
        Some(json) => serde_json::from_str(json)
            .map_err(|e| AppError::validation(format!("Invalid historyJson: {e}"))),
    }
}

impl AnalysisPayload {
    /// Validate into an [`AnalysisRequest`]
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed history, a missing
    /// conversation ID or draft flag, an empty text-only turn, or an invalid
    /// stage
    pub fn validate(self) -> AppResult<AnalysisRequest> {
        let history = parse_history(self.history_json.as_deref())?;

        let conversation_id = self
            .conversation_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::validation("conversationId is required"))?;

        let is_draft = self
            .is_draft
            .ok_or_else(|| AppError::validation("isDraft is required"))?
            .is_true();

        let new_message_text = self.new_message_text.unwrap_or_default();
        if new_message_text.trim().is_empty() && self.images.is_empty() {
            return Err(AppError::validation(
                "newMessageText is required when no images are attached",
            ));
        }

        let stage = resolve_stage(self.stage.as_deref(), &history, is_draft)?;

        Ok(AnalysisRequest {
            history,
            new_message_text,
            conversation_id,
            is_draft,
            intent: intent_for(is_draft),
            stage,
            images: self.images,
        })
    }
}
