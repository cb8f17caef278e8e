// ABOUTME: Prompt assembly for reply generation, nickname generation and image analysis
// ABOUTME: Deterministic message sequences built from PromptInput and the shared templates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Prompt Assembler
//!
//! The main prompt is `[system, optional few-shot, user]`. The user block is a
//! pure function of [`PromptInput`], laid out in a fixed order so the same
//! input always produces the same text. The assembled messages travel with the
//! request as a [`BuiltPrompt`] so the critique pass reviews exactly what the
//! generation call saw.

use std::fmt::Write as _;
use std::sync::Arc;

use wingman_core::models::{ConversationTurn, PromptInput, Role};

use crate::llm::prompts::{
    DESCRIBE_AND_NICKNAME_INSTRUCTION, IMAGE_ANALYSIS_INSTRUCTION, NICKNAME_FROM_MESSAGE_TEMPLATE,
    NICKNAME_WITH_DESCRIPTION_TEMPLATE,
};
use crate::llm::{ChatMessage, ContentPart, PromptTemplates};

/// Main prompt together with the input it was built from
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    /// Structured input
    pub input: PromptInput,
    /// `[system, optional few-shot, user]`
    pub messages: Vec<ChatMessage>,
}

/// Builds prompts from the shared, immutable templates
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    templates: Arc<PromptTemplates>,
}

impl PromptAssembler {
    /// Create an assembler over loaded templates
    #[must_use]
    pub const fn new(templates: Arc<PromptTemplates>) -> Self {
        Self { templates }
    }

    /// Templates in use
    #[must_use]
    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// Assemble the reply-generation prompt
    ///
    /// The few-shot message is omitted when the bank has no example for the
    /// input's intent and stage.
    #[must_use]
    pub fn build_main_prompt(&self, input: &PromptInput) -> BuiltPrompt {
        let mut messages = vec![ChatMessage::system(self.templates.system())];
        if let Some(example) = self.templates.few_shot(input.intent, input.stage) {
            messages.push(ChatMessage::system(example));
        }
        messages.push(ChatMessage::user(build_user_block(input)));

        BuiltPrompt {
            input: input.clone(),
            messages,
        }
    }
}

/// Render the user block of the main prompt
///
/// Order: header line, preferences (if any), history (if any), latest
/// message, then one `[Image Description: ...]` line per description.
#[must_use]
pub fn build_user_block(input: &PromptInput) -> String {
    let mut block = format!(
        "<!-- intent: {} | stage: {} | country: {} | simp: {} -->",
        input.intent, input.stage, input.preferred_country, input.simp_preference
    );

    let preferences = input.user_preferences.trim();
    if !preferences.is_empty() {
        let _ = write!(block, "\n\n[User Preferences]\n{preferences}");
    }

    if let Some(history) = input.chat_history.as_deref().filter(|h| !h.trim().is_empty()) {
        let _ = write!(block, "\n\n[Chat History]\n{history}");
    }

    let _ = write!(block, "\n\n[Latest Message]\n{}", input.latest_message);

    for description in &input.image_descriptions {
        let _ = write!(block, "\n[Image Description: {description}]");
    }

    block
}

/// Flatten history into one text block, `None` when there is no history
///
/// Each turn's image description is appended inline as
/// `[Image Description: ...]`.
#[must_use]
pub fn flatten_history(turns: &[ConversationTurn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }

    let lines: Vec<String> = turns
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            let mut line = format!("{speaker}: {}", turn.content.trim());
            if let Some(description) = turn
                .image_description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
            {
                let _ = write!(line, " [Image Description: {description}]");
            }
            line
        })
        .collect();

    Some(lines.join("\n"))
}

/// Single user message asking for a nickname
///
/// Uses the message-only template when no description is supplied.
#[must_use]
pub fn build_nickname_prompt(user_message: &str, image_description: Option<&str>) -> Vec<ChatMessage> {
    let text = match image_description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => NICKNAME_WITH_DESCRIPTION_TEMPLATE
            .replace("{message}", user_message.trim())
            .replace("{description}", description),
        None => NICKNAME_FROM_MESSAGE_TEMPLATE.replace("{message}", user_message.trim()),
    };
    vec![ChatMessage::user(text)]
}

/// Description-only vision prompt: fixed instruction, then the caller's content
#[must_use]
pub fn build_image_analysis_prompt(content: &[ContentPart]) -> Vec<ChatMessage> {
    vision_prompt(IMAGE_ANALYSIS_INSTRUCTION, content)
}

/// Combined description and nickname vision prompt
#[must_use]
pub fn build_describe_and_nickname_prompt(content: &[ContentPart]) -> Vec<ChatMessage> {
    vision_prompt(DESCRIBE_AND_NICKNAME_INSTRUCTION, content)
}

fn vision_prompt(instruction: &str, content: &[ContentPart]) -> Vec<ChatMessage> {
    let mut parts = Vec::with_capacity(content.len() + 1);
    parts.push(ContentPart::text(instruction));
    parts.extend_from_slice(content);
    vec![ChatMessage::user_parts(parts)]
}
