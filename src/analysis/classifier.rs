// ABOUTME: Conversation stage and intent classification
// ABOUTME: Validates explicit stages and infers one from history shape and the draft flag
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use wingman_core::models::{ConversationTurn, Intent, Role, Stage};

use crate::errors::{AppError, AppResult};

/// Whether `value` is exactly one of the three stage names (case-sensitive)
#[must_use]
pub fn is_valid_stage(value: &str) -> bool {
    value.parse::<Stage>().is_ok()
}

/// Infer the stage from history and the draft flag
///
/// A draft always refines an ongoing exchange. Otherwise an empty history is
/// an opening, a history ending with the user's own turn means the other side
/// went quiet, and anything else continues the conversation.
#[must_use]
pub fn infer_stage(history: &[ConversationTurn], is_draft: bool) -> Stage {
    if is_draft {
        return Stage::Continue;
    }
    match history.last() {
        None => Stage::Opening,
        Some(turn) if turn.role == Role::User => Stage::ReEngage,
        Some(_) => Stage::Continue,
    }
}

/// Map the draft flag to an intent
#[must_use]
pub const fn intent_for(is_draft: bool) -> Intent {
    if is_draft {
        Intent::RefineDraft
    } else {
        Intent::NewSuggestions
    }
}

/// Use the supplied stage when present, otherwise infer one
///
/// An empty or whitespace-only value counts as absent.
///
/// # Errors
///
/// Returns a validation error when a non-empty value is not a valid stage
pub fn resolve_stage(
    requested: Option<&str>,
    history: &[ConversationTurn],
    is_draft: bool,
) -> AppResult<Stage> {
    match requested.filter(|s| !s.trim().is_empty()) {
        Some(value) => value.parse().map_err(AppError::validation),
        None => Ok(infer_stage(history, is_draft)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histories() -> Vec<Vec<ConversationTurn>> {
        vec![
            vec![],
            vec![ConversationTurn::user("hi")],
            vec![ConversationTurn::assistant("hello")],
            vec![ConversationTurn::assistant("hello"), ConversationTurn::user("you there?")],
        ]
    }

    #[test]
    fn test_draft_always_continues() {
        for history in histories() {
            assert_eq!(infer_stage(&history, true), Stage::Continue);
        }
    }

    #[test]
    fn test_inference_without_draft() {
        assert_eq!(infer_stage(&[], false), Stage::Opening);
        assert_eq!(
            infer_stage(&[ConversationTurn::assistant("a"), ConversationTurn::user("b")], false),
            Stage::ReEngage
        );
        assert_eq!(
            infer_stage(&[ConversationTurn::user("a"), ConversationTurn::assistant("b")], false),
            Stage::Continue
        );
    }

    #[test]
    fn test_stage_validation_is_exact() {
        assert!(is_valid_stage("Opening"));
        assert!(is_valid_stage("Continue"));
        assert!(is_valid_stage("ReEngage"));
        assert!(!is_valid_stage("continue"));
        assert!(!is_valid_stage("Dating"));
    }

    #[test]
    fn test_resolve_stage() {
        assert_eq!(resolve_stage(Some("ReEngage"), &[], false).unwrap(), Stage::ReEngage);
        assert_eq!(resolve_stage(Some(""), &[], false).unwrap(), Stage::Opening);
        assert_eq!(resolve_stage(None, &[], true).unwrap(), Stage::Continue);
        let error = resolve_stage(Some("Flirt"), &[], false).unwrap_err();
        assert_eq!(error.code, crate::errors::ErrorCode::ValidationError);
        assert!(error.message.contains("Flirt"));
    }

    #[test]
    fn test_intent_mapping() {
        assert_eq!(intent_for(true), Intent::RefineDraft);
        assert_eq!(intent_for(false), Intent::NewSuggestions);
    }
}
