// ABOUTME: Centralized resource container shared by the HTTP handlers
// ABOUTME: Holds the database, auth manager and the wired analysis orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Server Resources
//!
//! Everything expensive is built once at startup and shared behind `Arc`.

use std::sync::Arc;

use tracing::info;

use crate::analysis::{AnalysisOrchestrator, PromptAssembler};
use crate::config::{environment::DEFAULT_MAX_UPLOAD_BYTES, ServerConfig};
use crate::database::SqliteChatStore;
use crate::errors::AppResult;
use crate::llm::{
    ChatProvider, CompletionProvider, LlmCompletionProvider, LlmProvider, PromptTemplates,
};
use crate::media::{ImageCompressor, JpegCompressor};
use crate::middleware::AuthManager;
use crate::storage::{BlobStore, LocalBlobStore};

/// Shared handler state
#[derive(Clone)]
pub struct ServerResources {
    /// Record and preferences store
    pub database: Arc<SqliteChatStore>,
    /// Bearer-token validation
    pub auth: Arc<AuthManager>,
    /// The analysis pipeline
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Provider name reported by `/health`
    pub provider_name: String,
    /// Backend checked by `/health`, when one is wired
    pub llm: Option<Arc<dyn LlmProvider>>,
    /// Request body limit
    pub max_upload_bytes: usize,
}

impl ServerResources {
    /// Wire resources from already-built collaborators
    #[must_use]
    pub fn new(
        database: Arc<SqliteChatStore>,
        provider: Arc<dyn CompletionProvider>,
        blobs: Arc<dyn BlobStore>,
        compressor: Arc<dyn ImageCompressor>,
        templates: Arc<PromptTemplates>,
        auth: AuthManager,
    ) -> Self {
        let orchestrator = AnalysisOrchestrator::new(
            provider,
            database.clone(),
            database.clone(),
            blobs,
            compressor,
            PromptAssembler::new(templates),
        );

        Self {
            database,
            auth: Arc::new(auth),
            orchestrator: Arc::new(orchestrator),
            provider_name: "custom".to_owned(),
            llm: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Name reported by `/health`
    #[must_use]
    pub fn with_provider_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = provider_name.into();
        self
    }

    /// Backend whose reachability `/health` reports
    #[must_use]
    pub fn with_llm_provider(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Override the request body limit
    #[must_use]
    pub const fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Build every resource from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database, the provider or the prompt templates
    /// cannot be initialised
    pub async fn from_config(config: &ServerConfig) -> AppResult<Self> {
        let database = Arc::new(SqliteChatStore::connect(&config.database_url).await?);

        let chat_provider = ChatProvider::from_config(&config.llm)?;
        let provider_name = chat_provider.display_name().to_owned();
        let provider: Arc<dyn LlmProvider> = Arc::new(chat_provider);

        let templates = Arc::new(PromptTemplates::load(config.prompts_dir.as_deref())?);
        let blobs = Arc::new(LocalBlobStore::from_config(&config.blob_storage));
        let compressor = Arc::new(JpegCompressor::from_config(&config.image));

        info!(
            provider = %provider_name,
            blob_root = %blobs.root().display(),
            "Server resources initialised"
        );

        Ok(Self::new(
            database,
            Arc::new(LlmCompletionProvider::new(provider.clone())),
            blobs,
            compressor,
            templates,
            AuthManager::new(config.jwt_secret.as_bytes()),
        )
        .with_provider_name(provider_name)
        .with_llm_provider(provider)
        .with_max_upload_bytes(config.max_upload_bytes))
    }
}
