// ABOUTME: Second-pass review of the streamed draft before it is persisted
// ABOUTME: Sends the generation prompt plus draft to a critique persona and keeps the draft on any failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::fmt::Write as _;

use tracing::{debug, warn};
use wingman_core::constants::limits;
use wingman_core::models::CritiqueResult;

use super::parser::{parse_critique_response, CRITIQUE_FORMAT_ERROR};
use super::prompt_builder::BuiltPrompt;
use crate::llm::{ChatMessage, CompletionOptions, CompletionProvider, MessageRole, PromptTemplates};

/// Build the critique request: persona system message plus one user message
/// holding the generation prompt and the draft
#[must_use]
pub fn build_critique_prompt(
    templates: &PromptTemplates,
    prompt: &BuiltPrompt,
    draft_reply: &str,
) -> Vec<ChatMessage> {
    let mut request = String::from("The writer was given these instructions and context.\n");

    for message in &prompt.messages {
        let heading = match message.role {
            MessageRole::System => "Writer instructions",
            MessageRole::User => "Writer input",
            MessageRole::Assistant => "Earlier writer output",
        };
        let _ = write!(request, "\n### {heading}\n{}\n", message.text().trim());
    }

    let _ = write!(request, "\n### Draft reply\n{}\n", draft_reply.trim());

    vec![
        ChatMessage::system(templates.critique()),
        ChatMessage::user(request),
    ]
}

/// Review `draft_reply` against the prompt that produced it
///
/// Never fails: a provider error is treated like unparseable output and the
/// draft is kept.
pub async fn run_critique(
    provider: &dyn CompletionProvider,
    templates: &PromptTemplates,
    prompt: &BuiltPrompt,
    draft_reply: &str,
) -> CritiqueResult {
    let messages = build_critique_prompt(templates, prompt, draft_reply);
    let options = CompletionOptions::max_tokens(limits::CRITIQUE_MAX_TOKENS)
        .with_temperature(limits::CRITIQUE_TEMPERATURE);

    match provider.complete(&messages, options).await {
        Ok(raw) => {
            let result = parse_critique_response(&raw, draft_reply);
            debug!(
                revised = result.final_reply != draft_reply,
                "Critique pass finished"
            );
            result
        }
        Err(e) => {
            warn!(error = %e, "Critique call failed, keeping draft reply");
            CritiqueResult {
                critique: CRITIQUE_FORMAT_ERROR.to_owned(),
                final_reply: draft_reply.to_owned(),
            }
        }
    }
}
