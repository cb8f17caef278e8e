// ABOUTME: Conversation route handlers for starting new chat threads
// ABOUTME: Creates a conversation owned by the authenticated caller so analysis requests can target it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::resources::ServerResources;

/// Request to create a conversation
#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Initial title; usually replaced by the generated nickname
    #[serde(default)]
    pub title: Option<String>,
}

/// Conversation routes handler
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/conversations", post(Self::create_conversation))
            .with_state(resources)
    }

    async fn create_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateConversationRequest>,
    ) -> Result<Response, AppError> {
        let user = resources
            .auth
            .resolve(&headers)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty());
        let conversation = resources
            .database
            .create_conversation(&user.user_id, title)
            .await?;

        info!(conversation_id = %conversation.id, "Conversation created");
        Ok((StatusCode::CREATED, Json(conversation)).into_response())
    }
}
