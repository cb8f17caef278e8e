// ABOUTME: Analysis pipeline state machine from identity check to persisted, critiqued reply
// ABOUTME: Runs fail-fast preparation, then streams the reply and finishes critique and persistence in-band
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Analysis Orchestrator
//!
//! One request moves through a fixed sequence of states:
//!
//! ```text
//! AuthResolved -> PrefsLoaded -> RequestParsed -> StubSaved -> StagedInputBuilt
//!   -> EnrichmentSkipped | EnrichmentRan -> PromptBuilt
//!   -> Streaming -> Streamed -> Critiqued -> Persisted -> Done
//! ```
//!
//! [`AnalysisOrchestrator::prepare`] covers everything up to `PromptBuilt` and
//! returns an [`AppError`] on any fatal step, before a response stream
//! exists. [`AnalysisOrchestrator::stream_and_finalize`] covers the rest and
//! never fails: errors after the stream opens are reported as a terminal
//! error event and logged.

use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use wingman_core::constants::defaults;
use wingman_core::models::{
    CritiqueResult, ImageRecord, Intent, MessageRecord, PromptInput, Role, Stage,
    UserPreferences,
};

use super::critique::run_critique;
use super::enrichment::{run_enrichment, EnrichmentPlan};
use super::events::StreamEvent;
use super::outcome::StepOutcome;
use super::parser::parse_suggestions;
use super::prompt_builder::{flatten_history, BuiltPrompt, PromptAssembler};
use super::request::{parse_history, AnalysisPayload, AnalysisRequest, DraftFlag, UploadedImage};
use super::classifier::{intent_for, resolve_stage};
use crate::errors::{AppError, AppResult};
use crate::llm::{CompletionOptions, CompletionProvider, ContentPart};
use crate::media::ImageCompressor;
use crate::middleware::AuthenticatedUser;
use crate::storage::{BlobStore, PreferencesStore, RecordStore};

// ============================================================================
// States
// ============================================================================

/// Pipeline position, logged at every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    /// Caller identity known
    AuthResolved,
    /// Preferences loaded or defaulted
    PrefsLoaded,
    /// Payload validated, stage and intent resolved
    RequestParsed,
    /// User turn persisted
    StubSaved,
    /// Images compressed and vision content assembled
    StagedInputBuilt,
    /// No enrichment call was needed
    EnrichmentSkipped,
    /// Nickname and/or description produced
    EnrichmentRan,
    /// Images stored and main prompt assembled
    PromptBuilt,
    /// Reply streaming to the client
    Streaming,
    /// Draft fully received
    Streamed,
    /// Critique pass finished
    Critiqued,
    /// Final reply stored
    Persisted,
    /// Channel closed
    Done,
}

impl AnalysisState {
    /// State name for logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AuthResolved => "auth_resolved",
            Self::PrefsLoaded => "prefs_loaded",
            Self::RequestParsed => "request_parsed",
            Self::StubSaved => "stub_saved",
            Self::StagedInputBuilt => "staged_input_built",
            Self::EnrichmentSkipped => "enrichment_skipped",
            Self::EnrichmentRan => "enrichment_ran",
            Self::PromptBuilt => "prompt_built",
            Self::Streaming => "streaming",
            Self::Streamed => "streamed",
            Self::Critiqued => "critiqued",
            Self::Persisted => "persisted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for AnalysisState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn enter(state: AnalysisState, conversation_id: Option<&str>) {
    debug!(state = %state, conversation_id, "Analysis state transition");
}

// ============================================================================
// Per-request values
// ============================================================================

/// An upload after best-effort compression
#[derive(Debug, Clone)]
struct StagedImage {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl StagedImage {
    fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

/// Everything the streaming half needs, produced by [`AnalysisOrchestrator::prepare`]
#[derive(Debug, Clone)]
pub struct PreparedAnalysis {
    /// Target conversation
    pub conversation_id: String,
    /// Persisted user turn
    pub user_message: MessageRecord,
    /// Enrichment branch taken
    pub plan: EnrichmentPlan,
    /// Whether this is the thread's first user turn
    pub is_initial_user_message: bool,
    /// Generated nickname
    pub nickname: Option<String>,
    /// Generated image description
    pub image_description: Option<String>,
    /// Image records persisted for the user turn
    pub stored_images: Vec<ImageRecord>,
    /// Main prompt, reused verbatim by the critique pass
    pub prompt: BuiltPrompt,
}

/// How the streaming half ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Draft streamed, critiqued and handed to the record store
    Completed,
    /// Provider finished without text; nothing to critique or persist
    EmptyDraft,
    /// Provider failed mid-stream; an error event was sent
    Failed,
}

/// Summary of the post-stream tail, returned by the spawned task
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Target conversation
    pub conversation_id: String,
    /// How streaming ended
    pub outcome: StreamOutcome,
    /// Concatenated streamed text
    pub draft_reply: String,
    /// Critique result when the critique pass ran
    pub critique: Option<CritiqueResult>,
    /// Stored assistant message, when persistence succeeded
    pub persisted_message: Option<MessageRecord>,
    /// Whether the client was still listening at the end
    pub client_connected: bool,
}

/// Live handle to a running analysis
#[derive(Debug)]
pub struct AnalysisHandle {
    /// Events for the client, ending with exactly one terminal event
    pub events: UnboundedReceiver<StreamEvent>,
    /// Resolves once critique and persistence are done
    pub completion: JoinHandle<AnalysisReport>,
}

/// Legacy single-shot suggestion request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    /// JSON array of history turns
    #[serde(default)]
    pub history_json: Option<String>,
    /// Message to reply to
    #[serde(default)]
    pub new_message_text: String,
    /// Draft flag
    pub is_draft: Option<DraftFlag>,
    /// Explicit stage
    #[serde(default)]
    pub stage: Option<String>,
}

/// Legacy single-shot suggestion response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    /// Resolved stage
    pub stage: Stage,
    /// Derived intent
    pub intent: Intent,
    /// Parsed suggestions
    pub suggestions: Vec<String>,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Sequences enrichment, generation, critique and persistence for one turn
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    provider: Arc<dyn CompletionProvider>,
    records: Arc<dyn RecordStore>,
    preferences: Arc<dyn PreferencesStore>,
    blobs: Arc<dyn BlobStore>,
    compressor: Arc<dyn ImageCompressor>,
    assembler: PromptAssembler,
}

impl AnalysisOrchestrator {
    /// Wire the orchestrator to its collaborators
    #[must_use]
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        records: Arc<dyn RecordStore>,
        preferences: Arc<dyn PreferencesStore>,
        blobs: Arc<dyn BlobStore>,
        compressor: Arc<dyn ImageCompressor>,
        assembler: PromptAssembler,
    ) -> Self {
        Self {
            provider,
            records,
            preferences,
            blobs,
            compressor,
            assembler,
        }
    }

    /// Prompt assembler in use
    #[must_use]
    pub const fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    /// Run the whole pipeline: prepare synchronously, stream on a spawned task
    ///
    /// The returned receiver yields chunk events and exactly one terminal
    /// event. Dropping it stops emission but not the critique and persist
    /// tail.
    ///
    /// # Errors
    ///
    /// Any fatal preparation step, before a stream exists
    pub async fn run(
        self: Arc<Self>,
        user: Option<&AuthenticatedUser>,
        payload: AnalysisPayload,
    ) -> AppResult<AnalysisHandle> {
        let prepared = self.prepare(user, payload).await?;
        let (tx, events) = mpsc::unbounded_channel();
        let completion = tokio::spawn(async move { self.stream_and_finalize(prepared, tx).await });
        Ok(AnalysisHandle { events, completion })
    }

    /// Steps up to `PromptBuilt`
    ///
    /// # Errors
    ///
    /// - `Unauthorized` without an identity
    /// - `ValidationError` for a bad payload
    /// - `ForeignKeyViolation` or `PersistenceError` when the stub cannot be saved
    /// - `ProviderError` from the combined describe-and-nickname call
    /// - `StorageError` when image records cannot be stored
    pub async fn prepare(
        &self,
        user: Option<&AuthenticatedUser>,
        payload: AnalysisPayload,
    ) -> AppResult<PreparedAnalysis> {
        let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        enter(AnalysisState::AuthResolved, None);

        let preferences = self.load_preferences(&user.user_id).await?;
        enter(AnalysisState::PrefsLoaded, None);

        let request = payload.validate()?;
        let conversation_id = request.conversation_id.clone();
        info!(
            conversation_id = %conversation_id,
            stage = %request.stage,
            intent = %request.intent,
            images = request.images.len(),
            "Analysis request accepted"
        );
        enter(AnalysisState::RequestParsed, Some(&conversation_id));

        let user_message = self.save_stub(&user.user_id, &request).await?;
        enter(AnalysisState::StubSaved, Some(&conversation_id));

        let staged = self.stage_images(&request.images).await;
        let is_initial_user_message = !request.history.iter().any(|turn| turn.role == Role::User);
        let latest_message = if request.has_text() {
            request.new_message_text.clone()
        } else {
            defaults::IMAGE_ONLY_PLACEHOLDER.to_owned()
        };
        let vision_content = build_user_content(&request, &staged);
        enter(AnalysisState::StagedInputBuilt, Some(&conversation_id));

        let has_images = !staged.is_empty();
        let plan = EnrichmentPlan::select(is_initial_user_message, has_images);
        let image_parts = if has_images { vision_content.as_slice() } else { &[] };
        let enrichment =
            run_enrichment(plan, self.provider.as_ref(), &latest_message, image_parts).await?;
        if plan == EnrichmentPlan::Skip {
            enter(AnalysisState::EnrichmentSkipped, Some(&conversation_id));
        } else {
            self.store_enrichment(
                &conversation_id,
                &user_message.id,
                is_initial_user_message,
                enrichment.nickname.as_deref(),
                enrichment.image_description.as_deref(),
            )
            .await;
            enter(AnalysisState::EnrichmentRan, Some(&conversation_id));
        }

        let stored_images = self
            .store_images(&user.user_id, &conversation_id, &user_message.id, &staged)
            .await?;

        let input = PromptInput {
            intent: request.intent,
            stage: request.stage,
            user_preferences: preferences.text,
            chat_history: flatten_history(&request.history),
            latest_message,
            image_descriptions: enrichment.image_description.iter().cloned().collect(),
            preferred_country: preferences.preferred_country,
            simp_preference: preferences.simp_preference,
        };
        let prompt = self.assembler.build_main_prompt(&input);
        enter(AnalysisState::PromptBuilt, Some(&conversation_id));

        Ok(PreparedAnalysis {
            conversation_id,
            user_message,
            plan,
            is_initial_user_message,
            nickname: enrichment.nickname,
            image_description: enrichment.image_description,
            stored_images,
            prompt,
        })
    }

    /// Steps from `Streaming` to `Done`
    ///
    /// Send failures mean the client went away; emission stops but the
    /// critique and persist tail still runs.
    pub async fn stream_and_finalize(
        &self,
        prepared: PreparedAnalysis,
        tx: UnboundedSender<StreamEvent>,
    ) -> AnalysisReport {
        let conversation_id = prepared.conversation_id.clone();
        enter(AnalysisState::Streaming, Some(&conversation_id));

        let mut draft_reply = String::new();
        let mut pending_title = if prepared.is_initial_user_message {
            prepared.nickname.clone()
        } else {
            None
        };
        let mut client_connected = true;

        let mut on_chunk = |chunk: &str| {
            draft_reply.push_str(chunk);
            if client_connected && tx.send(StreamEvent::chunk(chunk, pending_title.take())).is_err()
            {
                debug!("Client disconnected, no longer forwarding chunks");
                client_connected = false;
            }
        };
        let streamed = self
            .provider
            .stream_complete(&prepared.prompt.messages, &mut on_chunk)
            .await;

        let mut report = AnalysisReport {
            conversation_id: conversation_id.clone(),
            outcome: StreamOutcome::Completed,
            draft_reply,
            critique: None,
            persisted_message: None,
            client_connected,
        };

        if let Err(e) = streamed {
            error!(conversation_id = %conversation_id, error = %e, "Reply stream failed");
            report.client_connected &= tx.send(StreamEvent::error()).is_ok();
            report.outcome = StreamOutcome::Failed;
            enter(AnalysisState::Done, Some(&conversation_id));
            return report;
        }

        report.client_connected &= tx.send(StreamEvent::done(prepared.nickname.clone())).is_ok();
        drop(tx);
        enter(AnalysisState::Streamed, Some(&conversation_id));

        if report.draft_reply.trim().is_empty() {
            warn!(conversation_id = %conversation_id, "Provider streamed no text, skipping critique");
            report.outcome = StreamOutcome::EmptyDraft;
            enter(AnalysisState::Done, Some(&conversation_id));
            return report;
        }

        let critique = run_critique(
            self.provider.as_ref(),
            self.assembler.templates(),
            &prepared.prompt,
            &report.draft_reply,
        )
        .await;
        enter(AnalysisState::Critiqued, Some(&conversation_id));

        match self
            .records
            .insert_ai_message(&conversation_id, &critique.final_reply)
            .await
        {
            Ok(message) => {
                report.persisted_message = Some(message);
                enter(AnalysisState::Persisted, Some(&conversation_id));
            }
            Err(e) => {
                error!(conversation_id = %conversation_id, error = %e, "Failed to persist final reply");
            }
        }
        report.critique = Some(critique);

        enter(AnalysisState::Done, Some(&conversation_id));
        report
    }

    /// Legacy simple mode: one blocking completion parsed into a list
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `ValidationError` or `ProviderError`
    pub async fn suggestions(
        &self,
        user: Option<&AuthenticatedUser>,
        request: SuggestionRequest,
    ) -> AppResult<SuggestionResponse> {
        let user = user.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
        let preferences = self.load_preferences(&user.user_id).await?;

        let history = parse_history(request.history_json.as_deref())?;
        let is_draft = request
            .is_draft
            .ok_or_else(|| AppError::validation("isDraft is required"))?
            .is_true();
        if request.new_message_text.trim().is_empty() {
            return Err(AppError::validation("newMessageText is required"));
        }
        let stage = resolve_stage(request.stage.as_deref(), &history, is_draft)?;
        let intent = intent_for(is_draft);

        let input = PromptInput {
            intent,
            stage,
            user_preferences: preferences.text,
            chat_history: flatten_history(&history),
            latest_message: request.new_message_text,
            image_descriptions: Vec::new(),
            preferred_country: preferences.preferred_country,
            simp_preference: preferences.simp_preference,
        };
        let prompt = self.assembler.build_main_prompt(&input);
        let raw = self
            .provider
            .complete(&prompt.messages, CompletionOptions::default())
            .await?;

        Ok(SuggestionResponse {
            stage,
            intent,
            suggestions: parse_suggestions(&raw),
        })
    }

    // ========================================================================
    // Steps
    // ========================================================================

    async fn load_preferences(&self, user_id: &str) -> AppResult<UserPreferences> {
        StepOutcome::best_effort(
            self.preferences.get_preferences(user_id).await,
            UserPreferences::default(),
        )
        .into_result("load_preferences")
    }

    async fn save_stub(&self, user_id: &str, request: &AnalysisRequest) -> AppResult<MessageRecord> {
        let content = request.has_text().then_some(request.new_message_text.as_str());
        let stub = StepOutcome::required(
            self.records
                .insert_message_stub(user_id, &request.conversation_id, content)
                .await
                .map_err(AppError::from),
        )
        .into_result("insert_message_stub")?;

        StepOutcome::best_effort(
            self.records.touch_conversation(&request.conversation_id).await,
            (),
        )
        .into_result("touch_conversation")?;

        Ok(stub)
    }

    async fn stage_images(&self, images: &[UploadedImage]) -> Vec<StagedImage> {
        let mut staged = Vec::with_capacity(images.len());
        for image in images {
            let compressed = match self.compressor.compress(&image.bytes, &image.content_type).await {
                Ok(compressed) => StagedImage {
                    filename: image.filename.clone(),
                    content_type: compressed.content_type,
                    bytes: compressed.bytes,
                },
                Err(e) => {
                    warn!(filename = %image.filename, error = %e, "Compression failed, using original bytes");
                    StagedImage {
                        filename: image.filename.clone(),
                        content_type: image.content_type.clone(),
                        bytes: image.bytes.to_vec(),
                    }
                }
            };
            staged.push(compressed);
        }
        staged
    }

    async fn store_enrichment(
        &self,
        conversation_id: &str,
        message_id: &str,
        is_initial_user_message: bool,
        nickname: Option<&str>,
        image_description: Option<&str>,
    ) {
        if let (true, Some(nickname)) = (is_initial_user_message, nickname) {
            if let Err(e) = self
                .records
                .update_conversation_title(conversation_id, nickname)
                .await
            {
                warn!(conversation_id, error = %e, "Failed to store conversation title");
            }
        }

        if let Some(description) = image_description {
            if !self
                .records
                .update_message_image_description(message_id, description)
                .await
            {
                warn!(conversation_id, message_id, "Failed to store image description");
            }
        }
    }

    async fn store_images(
        &self,
        user_id: &str,
        conversation_id: &str,
        message_id: &str,
        staged: &[StagedImage],
    ) -> AppResult<Vec<ImageRecord>> {
        let mut stored = Vec::with_capacity(staged.len());
        for image in staged {
            let path = format!(
                "{user_id}/{conversation_id}/{message_id}/{}-{}",
                Uuid::new_v4(),
                sanitize_filename(&image.filename)
            );
            match self.blobs.upload(&path, &image.bytes, &image.content_type).await {
                Ok(storage_path) => stored.push(ImageRecord {
                    message_id: message_id.to_owned(),
                    storage_path,
                    filename: image.filename.clone(),
                    content_type: image.content_type.clone(),
                    filesize: image.bytes.len() as u64,
                }),
                Err(e) => {
                    warn!(conversation_id, filename = %image.filename, error = %e, "Image upload failed, skipping");
                }
            }
        }

        if !stored.is_empty() {
            StepOutcome::required(
                self.records
                    .insert_image_records(&stored)
                    .await
                    .map_err(|e| AppError::storage(format!("Failed to save image records: {e}"))),
            )
            .into_result("insert_image_records")?;
        }
        Ok(stored)
    }
}

/// Content for the vision calls
///
/// Text-only turns carry their text. Turns with images carry the images
/// only, preceded by a placeholder when the user sent no text.
fn build_user_content(request: &AnalysisRequest, staged: &[StagedImage]) -> Vec<ContentPart> {
    if staged.is_empty() {
        return vec![ContentPart::text(request.new_message_text.clone())];
    }

    let mut content = Vec::with_capacity(staged.len() + 1);
    if !request.has_text() {
        content.push(ContentPart::text(defaults::IMAGE_ONLY_PLACEHOLDER));
    }
    content.extend(staged.iter().map(|image| ContentPart::image(image.data_url())));
    content
}

/// Keep a client file name safe to use as a path segment
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "image".to_owned()
    } else {
        trimmed.to_owned()
    }
}
