// ABOUTME: Analysis route handlers: streamed multipart analysis and legacy JSON suggestions
// ABOUTME: Reads the multipart form, runs the orchestrator and relays its events as SSE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! Analysis routes
//!
//! `POST /api/analyze` answers pre-stream failures with the JSON error body
//! and otherwise returns `text/event-stream`, one JSON event per `data:`
//! line. `POST /api/suggestions` is the stateless legacy mode.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::analysis::events::STREAM_ERROR_TEXT;
use crate::analysis::{
    AnalysisPayload, DraftFlag, StreamEvent, SuggestionRequest, SuggestionResponse, UploadedImage,
};
use crate::errors::AppError;
use crate::middleware::AuthenticatedUser;
use crate::resources::ServerResources;

/// Multipart field names
mod fields {
    pub const HISTORY_JSON: &str = "historyJson";
    pub const NEW_MESSAGE_TEXT: &str = "newMessageText";
    pub const CONVERSATION_ID: &str = "conversationId";
    pub const IS_DRAFT: &str = "isDraft";
    pub const STAGE: &str = "stage";
    pub const IMAGES: &str = "images";
}

/// Analysis routes handler
pub struct AnalysisRoutes;

impl AnalysisRoutes {
    /// Create all analysis routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/analyze", post(Self::analyze))
            .route("/api/suggestions", post(Self::suggestions))
            .with_state(resources)
    }

    fn authenticate(
        headers: &HeaderMap,
        resources: &ServerResources,
    ) -> Result<AuthenticatedUser, AppError> {
        resources
            .auth
            .resolve(headers)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }

    /// Run the pipeline and stream the reply
    async fn analyze(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        multipart: Multipart,
    ) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
        let user = Self::authenticate(&headers, &resources)?;
        let payload = read_analysis_form(multipart).await?;

        let handle = resources
            .orchestrator
            .clone()
            .run(Some(&user), payload)
            .await?;

        let completion = handle.completion;
        tokio::spawn(async move {
            match completion.await {
                Ok(report) => debug!(
                    conversation_id = %report.conversation_id,
                    outcome = ?report.outcome,
                    persisted = report.persisted_message.is_some(),
                    client_connected = report.client_connected,
                    "Analysis finished"
                ),
                Err(e) => warn!(error = %e, "Analysis task panicked or was cancelled"),
            }
        });

        let stream = UnboundedReceiverStream::new(handle.events)
            .map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
        Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
    }

    /// Legacy simple mode
    async fn suggestions(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<SuggestionRequest>,
    ) -> Result<Json<SuggestionResponse>, AppError> {
        let user = Self::authenticate(&headers, &resources)?;
        let response = resources
            .orchestrator
            .suggestions(Some(&user), request)
            .await?;
        Ok(Json(response))
    }
}

fn to_sse_event(event: &StreamEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            warn!(error = %e, "Failed to serialize stream event");
            Event::default().data(
                serde_json::json!({"type": "error", "text": STREAM_ERROR_TEXT, "done": true})
                    .to_string(),
            )
        }
    }
}

async fn field_text(field: Field<'_>) -> Result<String, AppError> {
    let name = field.name().unwrap_or_default().to_owned();
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Invalid {name} field: {e}")))
}

/// Collect the analysis form; unknown fields are ignored
async fn read_analysis_form(mut multipart: Multipart) -> Result<AnalysisPayload, AppError> {
    let mut payload = AnalysisPayload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            fields::HISTORY_JSON => payload.history_json = Some(field_text(field).await?),
            fields::NEW_MESSAGE_TEXT => payload.new_message_text = Some(field_text(field).await?),
            fields::CONVERSATION_ID => payload.conversation_id = Some(field_text(field).await?),
            fields::IS_DRAFT => payload.is_draft = Some(DraftFlag::Text(field_text(field).await?)),
            fields::STAGE => payload.stage = Some(field_text(field).await?),
            fields::IMAGES => {
                if let Some(image) = read_image(field).await? {
                    payload.images.push(image);
                }
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    Ok(payload)
}

/// Read one file part; empty parts (no file chosen) are skipped
async fn read_image(field: Field<'_>) -> Result<Option<UploadedImage>, AppError> {
    let filename = field.file_name().unwrap_or("image").to_owned();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_owned();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::validation(format!("Failed to read {filename}: {e}")))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    if !content_type.starts_with("image/") {
        return Err(AppError::validation(format!(
            "{filename} is not an image ({content_type})"
        )));
    }

    Ok(Some(UploadedImage {
        filename,
        content_type,
        bytes,
    }))
}
