// ABOUTME: Reply orchestration pipeline: parsing, classification, prompts, enrichment, critique
// ABOUTME: The orchestrator sequences these parts for each incoming chat turn
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Analysis
//!
//! Leaves first: [`parser`] and [`classifier`] are pure, [`prompt_builder`]
//! depends only on the loaded templates, [`enrichment`] and [`critique`] call
//! the completion provider, and [`orchestrator`] ties everything to the
//! record, preference and blob stores.

/// Stage and intent resolution
pub mod classifier;
/// Second-pass review of the streamed draft
pub mod critique;
/// Nickname and image description generation
pub mod enrichment;
/// Client-facing stream events
pub mod events;
/// The per-request state machine
pub mod orchestrator;
/// Completed/degraded/fatal step results
pub mod outcome;
/// Extraction of structured values from model text
pub mod parser;
/// Prompt assembly
pub mod prompt_builder;
/// Inbound payload validation
pub mod request;

pub use classifier::{infer_stage, intent_for, is_valid_stage, resolve_stage};
pub use critique::run_critique;
pub use enrichment::{Enrichment, EnrichmentPlan};
pub use events::{StreamEvent, StreamEventKind};
pub use orchestrator::{
    AnalysisHandle, AnalysisOrchestrator, AnalysisReport, AnalysisState, PreparedAnalysis,
    StreamOutcome, SuggestionRequest, SuggestionResponse,
};
pub use outcome::StepOutcome;
pub use parser::{
    parse_critique_response, parse_image_description_and_nickname, parse_suggestions,
    strip_quotes,
};
pub use prompt_builder::{BuiltPrompt, PromptAssembler};
pub use request::{AnalysisPayload, AnalysisRequest, DraftFlag, UploadedImage};
