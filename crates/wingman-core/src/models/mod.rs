// ABOUTME: Domain models for the reply-orchestration pipeline
// ABOUTME: Re-exports conversation records and per-request analysis value objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

mod analysis;
mod conversation;

pub use analysis::{
    CritiqueResult, NicknameAndDescription, PromptInput, SimpPreference, UserPreferences,
};
pub use conversation::{
    ConversationTurn, ImageRecord, Intent, MessageRecord, Role, Sender, Stage,
};
