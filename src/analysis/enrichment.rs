// ABOUTME: Image description and nickname generation ahead of the main reply
// ABOUTME: Selects one of four enrichment branches and runs its completion calls with per-branch failure policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Enrichment
//!
//! | first user turn | images | branch | failure policy |
//! |---|---|---|---|
//! | yes | yes | `DescribeAndNickname` | fatal |
//! | yes | no | `NicknameOnly` | nickname falls back to `Chat Pal` |
//! | no | yes | `DescribeThenRenickname` | description falls back, nickname falls back |
//! | no | no | `Skip` | no call |

use std::fmt;

use tracing::{debug, warn};
use wingman_core::constants::{defaults, limits};
use wingman_core::models::NicknameAndDescription;

use super::outcome::StepOutcome;
use super::parser::{parse_image_description_and_nickname, strip_quotes};
use super::prompt_builder::{
    build_describe_and_nickname_prompt, build_image_analysis_prompt, build_nickname_prompt,
};
use crate::errors::AppResult;
use crate::llm::{CompletionOptions, CompletionProvider, ContentPart};

/// The enrichment branch chosen for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentPlan {
    /// First image-bearing user turn: one combined call
    DescribeAndNickname,
    /// First user turn without images: nickname from text
    NicknameOnly,
    /// Later turn with images: describe, then refresh the nickname
    DescribeThenRenickname,
    /// Later turn without images: nothing to do
    Skip,
}

impl EnrichmentPlan {
    /// Pick the branch; exactly one applies to any request
    #[must_use]
    pub const fn select(is_initial_user_message: bool, has_images: bool) -> Self {
        match (is_initial_user_message, has_images) {
            (true, true) => Self::DescribeAndNickname,
            (true, false) => Self::NicknameOnly,
            (false, true) => Self::DescribeThenRenickname,
            (false, false) => Self::Skip,
        }
    }

    /// Branch name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DescribeAndNickname => "describe_and_nickname",
            Self::NicknameOnly => "nickname_only",
            Self::DescribeThenRenickname => "describe_then_renickname",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for EnrichmentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What enrichment produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Generated nickname
    pub nickname: Option<String>,
    /// Generated image description
    pub image_description: Option<String>,
}

/// One combined call producing both a description and a nickname
///
/// # Errors
///
/// Provider failures propagate: this path runs on a thread's first
/// image-bearing turn and blocks the request.
pub async fn describe_and_nickname(
    provider: &dyn CompletionProvider,
    image_content: &[ContentPart],
) -> AppResult<NicknameAndDescription> {
    let raw = provider
        .complete(
            &build_describe_and_nickname_prompt(image_content),
            CompletionOptions::max_tokens(limits::IMAGE_ANALYSIS_MAX_TOKENS),
        )
        .await?;
    Ok(parse_image_description_and_nickname(&raw))
}

/// Description-only call that never fails the request
pub async fn describe_only(
    provider: &dyn CompletionProvider,
    image_content: &[ContentPart],
) -> StepOutcome<String> {
    let result = provider
        .complete(
            &build_image_analysis_prompt(image_content),
            CompletionOptions::max_tokens(limits::IMAGE_ANALYSIS_MAX_TOKENS),
        )
        .await;

    match result {
        Ok(text) if text.trim().is_empty() => {
            StepOutcome::degraded(defaults::IMAGE_ANALYZED.to_owned(), "blank description")
        }
        Ok(text) => StepOutcome::Completed(text.trim().to_owned()),
        Err(e) => StepOutcome::degraded(defaults::IMAGE_ANALYSIS_FAILED.to_owned(), e.to_string()),
    }
}

/// Nickname from the user's message and an optional image description
pub async fn nickname_from_text_and_description(
    provider: &dyn CompletionProvider,
    user_message: &str,
    image_description: Option<&str>,
) -> StepOutcome<String> {
    let result = provider
        .complete(
            &build_nickname_prompt(user_message, image_description),
            CompletionOptions::max_tokens(limits::NICKNAME_MAX_TOKENS),
        )
        .await;

    match result.map(|raw| strip_quotes(&raw)) {
        Ok(nickname) if nickname.is_empty() => {
            StepOutcome::degraded(defaults::NICKNAME.to_owned(), "blank nickname")
        }
        Ok(nickname) => StepOutcome::Completed(nickname),
        Err(e) => StepOutcome::degraded(defaults::NICKNAME.to_owned(), e.to_string()),
    }
}

/// Run the selected branch
///
/// # Errors
///
/// Only [`EnrichmentPlan::DescribeAndNickname`] can fail.
pub async fn run_enrichment(
    plan: EnrichmentPlan,
    provider: &dyn CompletionProvider,
    user_message: &str,
    image_content: &[ContentPart],
) -> AppResult<Enrichment> {
    debug!(branch = %plan, images = image_content.len(), "Running enrichment");

    let enrichment = match plan {
        EnrichmentPlan::DescribeAndNickname => {
            let NicknameAndDescription {
                nickname,
                image_description,
            } = StepOutcome::required(describe_and_nickname(provider, image_content).await)
                .into_result("describe_and_nickname")?;
            Enrichment {
                nickname: Some(nickname),
                image_description: Some(image_description),
            }
        }
        EnrichmentPlan::NicknameOnly => Enrichment {
            nickname: Some(
                nickname_from_text_and_description(provider, user_message, None)
                    .await
                    .into_result("nickname")?,
            ),
            image_description: None,
        },
        EnrichmentPlan::DescribeThenRenickname => {
            let outcome = describe_only(provider, image_content).await;
            if outcome.is_degraded() {
                warn!(branch = %plan, "Image description unavailable, using fallback text");
            }
            let description = outcome.into_result("describe_only")?;
            let nickname =
                nickname_from_text_and_description(provider, user_message, Some(&description))
                    .await
                    .into_result("nickname")?;
            Enrichment {
                nickname: Some(nickname),
                image_description: Some(description),
            }
        }
        EnrichmentPlan::Skip => Enrichment::default(),
    };

    Ok(enrichment)
}
