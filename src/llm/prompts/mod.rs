// ABOUTME: Prompt templates for reply generation, critique, image analysis and nicknames
// ABOUTME: Built-in markdown embedded at compile time, optionally overridden from a directory at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Prompt Templates
//!
//! Templates are loaded once when the server starts and then shared
//! read-only through [`PromptTemplates`]. Built-in copies are compiled in
//! from the markdown files next to this module; a `PROMPTS_DIR` may replace
//! `system.md`, `critique.md` or any `few_shot/<Intent>_<Stage>.md`.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::info;
use wingman_core::models::{Intent, Stage};

use crate::errors::{AppError, AppResult};

/// Reply-writer persona and policy
pub const SYSTEM_PROMPT: &str = include_str!("system.md");

/// Critique-pass persona and output format
pub const CRITIQUE_PROMPT: &str = include_str!("critique.md");

/// Instruction prepended to image content for description-only analysis
pub const IMAGE_ANALYSIS_INSTRUCTION: &str = "Describe the image(s) for context in a dating-app \
conversation. In two or three sentences, mention the people, setting, activities and any details \
that could spark a conversation. Output only the description.";

/// Instruction prepended to image content for the first image-bearing turn
pub const DESCRIBE_AND_NICKNAME_INSTRUCTION: &str = "Describe the image(s) for context in a \
dating-app conversation in two or three sentences. Then, on a new final line, give a short \
playful nickname (at most four words) for the person the user is talking to, written as \
`Nickname: <nickname>`.";

/// Nickname prompt when an image description is available
pub const NICKNAME_WITH_DESCRIPTION_TEMPLATE: &str = "Suggest a short, playful, friendly nickname \
(at most four words) for the person who sent this message, based on the message and the \
description of their image(s). Reply with the nickname only.\n\nMessage: {message}\n\nImage \
description: {description}";

/// Nickname prompt from the message alone
pub const NICKNAME_FROM_MESSAGE_TEMPLATE: &str = "Suggest a short, playful, friendly nickname (at \
most four words) for the person who sent this message. Reply with the nickname only.\n\n\
Message: {message}";

const BUILTIN_FEW_SHOTS: [(Intent, Stage, &str); 4] = [
    (
        Intent::NewSuggestions,
        Stage::Opening,
        include_str!("few_shot/NewSuggestions_Opening.md"),
    ),
    (
        Intent::NewSuggestions,
        Stage::Continue,
        include_str!("few_shot/NewSuggestions_Continue.md"),
    ),
    (
        Intent::NewSuggestions,
        Stage::ReEngage,
        include_str!("few_shot/NewSuggestions_ReEngage.md"),
    ),
    (
        Intent::RefineDraft,
        Stage::Continue,
        include_str!("few_shot/RefineDraft_Continue.md"),
    ),
];

const INTENTS: [Intent; 2] = [Intent::NewSuggestions, Intent::RefineDraft];

/// Immutable prompt configuration shared by every request
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    system: String,
    critique: String,
    few_shots: HashMap<(Intent, Stage), String>,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptTemplates {
    /// Templates compiled into the binary
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_owned(),
            critique: CRITIQUE_PROMPT.to_owned(),
            few_shots: BUILTIN_FEW_SHOTS
                .iter()
                .map(|(intent, stage, text)| ((*intent, *stage), (*text).to_owned()))
                .collect(),
        }
    }

    /// Built-in templates with any files found in `dir` taking precedence
    ///
    /// # Errors
    ///
    /// Returns a config error if an override file exists but cannot be read
    pub fn load(dir: Option<&Path>) -> AppResult<Self> {
        let mut templates = Self::builtin();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        let mut overridden = 0_usize;
        if let Some(system) = read_override(&dir.join("system.md"))? {
            templates.system = system;
            overridden += 1;
        }
        if let Some(critique) = read_override(&dir.join("critique.md"))? {
            templates.critique = critique;
            overridden += 1;
        }
        for intent in INTENTS {
            for stage in Stage::ALL {
                let path = dir.join("few_shot").join(format!("{intent}_{stage}.md"));
                if let Some(text) = read_override(&path)? {
                    templates.few_shots.insert((intent, stage), text);
                    overridden += 1;
                }
            }
        }

        info!(dir = %dir.display(), overridden, "Loaded prompt templates");
        Ok(templates)
    }

    /// System prompt for reply generation
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// System prompt for the critique pass
    #[must_use]
    pub fn critique(&self) -> &str {
        &self.critique
    }

    /// Example for an intent/stage pair, if the bank has one
    #[must_use]
    pub fn few_shot(&self, intent: Intent, stage: Stage) -> Option<&str> {
        self.few_shots.get(&(intent, stage)).map(String::as_str)
    }

    /// Replace or add one example
    #[must_use]
    pub fn with_few_shot(mut self, intent: Intent, stage: Stage, text: impl Into<String>) -> Self {
        self.few_shots.insert((intent, stage), text.into());
        self
    }

    /// Remove every example
    #[must_use]
    pub fn without_few_shots(mut self) -> Self {
        self.few_shots.clear();
        self
    }
}

fn read_override(path: &Path) -> AppResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Ok(Some(text)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::config(format!(
            "Failed to read prompt template {}: {e}",
            path.display()
        ))),
    }
}
