// ABOUTME: Shared test helpers and utilities for integration tests
// ABOUTME: Wires orchestrators and server resources around in-memory collaborators
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

pub mod axum_test;
pub mod fakes;

use std::sync::Arc;

use bytes::Bytes;
use wingman_server::analysis::{
    AnalysisOrchestrator, AnalysisPayload, DraftFlag, PromptAssembler, StreamEvent, UploadedImage,
};
use wingman_server::database::SqliteChatStore;
use wingman_server::llm::{CompletionProvider, PromptTemplates};
use wingman_server::media::ImageCompressor;
use wingman_server::middleware::{AuthManager, AuthenticatedUser};
use wingman_server::resources::ServerResources;
use wingman_server::storage::BlobStore;

use fakes::{MemoryBlobStore, MemoryStore, PassthroughCompressor, ScriptedProvider};

pub const TEST_USER: &str = "user-1";
pub const OTHER_USER: &str = "user-2";
pub const TEST_CONVERSATION: &str = "conv-1";
pub const JWT_SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes-long";

pub fn init_test_logging() {
    wingman_server::logging::init_test_logging();
}

pub fn user() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: TEST_USER.to_owned(),
    }
}

/// Orchestrator and the fakes it was built from
pub struct Pipeline {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub provider: Arc<ScriptedProvider>,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Build an orchestrator around the given provider and store
pub fn pipeline(provider: ScriptedProvider, store: MemoryStore) -> Pipeline {
    pipeline_with_compressor(provider, store, Arc::new(PassthroughCompressor))
}

pub fn pipeline_with_compressor(
    provider: ScriptedProvider,
    store: MemoryStore,
    compressor: Arc<dyn ImageCompressor>,
) -> Pipeline {
    init_test_logging();
    let provider = Arc::new(provider);
    let store = Arc::new(store);
    let blobs = Arc::new(MemoryBlobStore::new());

    let orchestrator = AnalysisOrchestrator::new(
        provider.clone() as Arc<dyn CompletionProvider>,
        store.clone(),
        store.clone(),
        blobs.clone() as Arc<dyn BlobStore>,
        compressor,
        PromptAssembler::new(Arc::new(PromptTemplates::builtin())),
    );

    Pipeline {
        orchestrator: Arc::new(orchestrator),
        provider,
        store,
        blobs,
    }
}

/// A text-only payload for the test conversation
pub fn text_payload(text: &str) -> AnalysisPayload {
    AnalysisPayload {
        history_json: Some("[]".to_owned()),
        new_message_text: Some(text.to_owned()),
        conversation_id: Some(TEST_CONVERSATION.to_owned()),
        is_draft: Some(DraftFlag::Text("false".to_owned())),
        stage: None,
        images: Vec::new(),
    }
}

pub fn png_upload(filename: &str) -> UploadedImage {
    UploadedImage {
        filename: filename.to_owned(),
        content_type: "image/png".to_owned(),
        bytes: Bytes::from_static(b"\x89PNG fake image bytes"),
    }
}

/// Drain a receiver until the channel closes
pub async fn collect_events(
    mut events: tokio::sync::mpsc::UnboundedReceiver<StreamEvent>,
) -> Vec<StreamEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

/// Server resources over an in-memory `SQLite` database
pub struct TestServer {
    pub resources: Arc<ServerResources>,
    pub database: Arc<SqliteChatStore>,
    pub provider: Arc<ScriptedProvider>,
    pub token: String,
}

pub async fn test_server(provider: ScriptedProvider) -> TestServer {
    init_test_logging();
    let database = Arc::new(SqliteChatStore::connect("sqlite::memory:").await.unwrap());
    let provider = Arc::new(provider);
    let auth = AuthManager::new(JWT_SECRET);
    let token = auth.generate_token(TEST_USER).unwrap();

    let resources = ServerResources::new(
        database.clone(),
        provider.clone(),
        Arc::new(MemoryBlobStore::new()),
        Arc::new(PassthroughCompressor),
        Arc::new(PromptTemplates::builtin()),
        auth,
    )
    .with_provider_name("scripted");

    TestServer {
        resources: Arc::new(resources),
        database,
        provider,
        token,
    }
}
