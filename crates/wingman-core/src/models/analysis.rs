// ABOUTME: Value objects threaded through prompt assembly, enrichment and critique
// ABOUTME: PromptInput, user preferences, critique result and nickname/description pair
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::conversation::{Intent, Stage};
use crate::constants::defaults;

/// How eager the generated replies are allowed to sound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpPreference {
    /// Let the model decide
    #[default]
    Auto,
    /// Playful and a little aloof
    Low,
    /// Balanced
    Neutral,
    /// Openly enthusiastic
    High,
}

impl SimpPreference {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Low => "low",
            Self::Neutral => "neutral",
            Self::High => "high",
        }
    }

    /// Lenient parse used for stored values: unknown values become `Auto`
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for SimpPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimpPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "low" => Ok(Self::Low),
            "neutral" => Ok(Self::Neutral),
            "high" => Ok(Self::High),
            other => Err(format!("Unknown simp preference: {other}")),
        }
    }
}

/// Per-user tuning read from the preferences store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Free-text preferences ("I like hiking, keep it short")
    pub text: String,
    /// Locale hint or `auto`
    pub preferred_country: String,
    /// Reply eagerness
    pub simp_preference: SimpPreference,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            text: String::new(),
            preferred_country: defaults::PREFERRED_COUNTRY.to_owned(),
            simp_preference: SimpPreference::Auto,
        }
    }
}

/// Immutable input to prompt assembly and critique, built once per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptInput {
    /// Drafting mode
    pub intent: Intent,
    /// Conversation phase
    pub stage: Stage,
    /// Free-text user preferences
    pub user_preferences: String,
    /// Flattened history, `None` when there is none
    pub chat_history: Option<String>,
    /// The message being replied to
    pub latest_message: String,
    /// Descriptions of images attached to the latest message
    pub image_descriptions: Vec<String>,
    /// Locale hint or `auto`
    pub preferred_country: String,
    /// Reply eagerness
    pub simp_preference: SimpPreference,
}

/// Outcome of the critique pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueResult {
    /// Reviewer notes, or a fallback explanation
    pub critique: String,
    /// Reply to persist; never empty when the draft was not empty
    pub final_reply: String,
}

/// Enrichment output for the first image-bearing turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameAndDescription {
    /// Playful nickname used as the conversation title
    pub nickname: String,
    /// Short description of the uploaded images
    pub image_description: String,
}
