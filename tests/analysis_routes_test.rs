// ABOUTME: Integration tests for the HTTP routes
// ABOUTME: Tests auth, multipart validation, SSE streaming, legacy suggestions, conversations and health
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use helpers::axum_test::{AxumTestRequest, MultipartForm};
use helpers::fakes::{FixedHealthProvider, Purpose, ScriptedProvider};
use helpers::{test_server, TestServer, TEST_USER};
use serde_json::json;
use wingman_server::analysis::{StreamEventKind, SuggestionResponse};
use wingman_server::errors::{ErrorCode, ErrorResponse};
use wingman_server::models::{MessageRecord, Sender};
use wingman_server::routes;

// ============================================================================
// Test Helpers
// ============================================================================

async fn conversation_for(server: &TestServer) -> String {
    server
        .database
        .create_conversation(TEST_USER, None)
        .await
        .unwrap()
        .id
}

fn analysis_form(conversation_id: &str) -> MultipartForm {
    MultipartForm::new()
        .text("historyJson", "[]")
        .text("newMessageText", "hello")
        .text("conversationId", conversation_id)
        .text("isDraft", "false")
}

/// Wait for the post-stream tail to store the assistant reply
async fn wait_for_ai_reply(server: &TestServer, conversation_id: &str) -> MessageRecord {
    for _ in 0..100 {
        let messages = server.database.list_messages(conversation_id).await.unwrap();
        if let Some(reply) = messages.into_iter().find(|m| m.sender == Sender::Ai) {
            return reply;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("assistant reply was never persisted");
}

// ============================================================================
// Analyze
// ============================================================================

#[tokio::test]
async fn test_analyze_streams_events_and_persists_reply() {
    let server = test_server(
        ScriptedProvider::new()
            .respond(Purpose::Nickname, "Sunny Smiles")
            .respond(Purpose::Critique, "[CRITIQUE]: ok\n[FINAL REPLY]: Hey you!")
            .stream(&["Hey", " there"]),
    )
    .await;
    let conversation_id = conversation_for(&server).await;

    let response = AxumTestRequest::post("/api/analyze")
        .bearer(&server.token)
        .multipart(&analysis_form(&conversation_id))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response
        .content_type()
        .is_some_and(|ct| ct.starts_with("text/event-stream")));

    let events = response.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].conversation_title.as_deref(), Some("Sunny Smiles"));
    let text: String = events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(text, "Hey there");
    assert_eq!(events[2].kind, StreamEventKind::Done);

    let reply = wait_for_ai_reply(&server, &conversation_id).await;
    assert_eq!(reply.content.as_deref(), Some("Hey you!"));

    let conversation = server
        .database
        .get_conversation(&conversation_id, TEST_USER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.title.as_deref(), Some("Sunny Smiles"));
}

#[tokio::test]
async fn test_analyze_without_token_is_unauthorized() {
    let server = test_server(ScriptedProvider::new()).await;
    let conversation_id = conversation_for(&server).await;

    let response = AxumTestRequest::post("/api/analyze")
        .multipart(&analysis_form(&conversation_id))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.code, ErrorCode::Unauthorized);
    assert!(server.provider.calls().is_empty());
}

#[tokio::test]
async fn test_analyze_with_bad_token_is_unauthorized() {
    let server = test_server(ScriptedProvider::new()).await;
    let conversation_id = conversation_for(&server).await;

    let response = AxumTestRequest::post("/api/analyze")
        .bearer("not-a-jwt")
        .multipart(&analysis_form(&conversation_id))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_analyze_missing_draft_flag_is_validation_error() {
    let server = test_server(ScriptedProvider::new()).await;
    let conversation_id = conversation_for(&server).await;

    let form = MultipartForm::new()
        .text("newMessageText", "hello")
        .text("conversationId", &conversation_id);
    let response = AxumTestRequest::post("/api/analyze")
        .bearer(&server.token)
        .multipart(&form)
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.code, ErrorCode::ValidationError);
    assert!(body.error.message.contains("isDraft"));
    assert!(server
        .database
        .list_messages(&conversation_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_analyze_unknown_conversation_is_foreign_key_violation() {
    let server = test_server(ScriptedProvider::new()).await;

    let response = AxumTestRequest::post("/api/analyze")
        .bearer(&server.token)
        .multipart(&analysis_form("no-such-conversation"))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.code, ErrorCode::ForeignKeyViolation);
    assert_eq!(body.error.message, "Invalid conversation ID");
}

#[tokio::test]
async fn test_analyze_rejects_non_image_upload() {
    let server = test_server(ScriptedProvider::new()).await;
    let conversation_id = conversation_for(&server).await;

    let form = analysis_form(&conversation_id).file(
        "images",
        "notes.txt",
        "text/plain",
        b"definitely not an image",
    );
    let response = AxumTestRequest::post("/api/analyze")
        .bearer(&server.token)
        .multipart(&form)
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: ErrorResponse = response.json();
    assert_eq!(body.error.code, ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_analyze_image_turn_stores_image_record() {
    let server = test_server(
        ScriptedProvider::new()
            .respond(Purpose::Vision, "A dog at the park.\nNickname: Dog Lover")
            .stream(&["Cute dog!"]),
    )
    .await;
    let conversation_id = conversation_for(&server).await;

    let form = MultipartForm::new()
        .text("conversationId", &conversation_id)
        .text("isDraft", "false")
        .file("images", "dog.png", "image/png", b"\x89PNG not really")
        .file("images", "", "application/octet-stream", b"");
    let response = AxumTestRequest::post("/api/analyze")
        .bearer(&server.token)
        .multipart(&form)
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let events = response.events();
    assert_eq!(events.last().unwrap().conversation_title.as_deref(), Some("Dog Lover"));

    let messages = server.database.list_messages(&conversation_id).await.unwrap();
    let stub = messages.iter().find(|m| m.sender == Sender::User).unwrap();
    assert!(stub.content.is_none());
    assert_eq!(stub.image_description.as_deref(), Some("A dog at the park."));

    let images = server.database.list_images(&stub.id).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].filename, "dog.png");
}

// ============================================================================
// Suggestions, conversations, health
// ============================================================================

#[tokio::test]
async fn test_suggestions_returns_parsed_list() {
    let server = test_server(ScriptedProvider::new().respond(
        Purpose::Other,
        "1. How was the hike?\n2. Which trail was your favourite?",
    ))
    .await;

    let response = AxumTestRequest::post("/api/suggestions")
        .bearer(&server.token)
        .json(&json!({
            "historyJson": "[{\"sender\":\"user\",\"content\":\"hey\"}]",
            "newMessageText": "Just got back from a hike",
            "isDraft": false
        }))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: SuggestionResponse = response.json();
    assert_eq!(body.suggestions.len(), 2);
    assert_eq!(body.stage.as_str(), "ReEngage");
}

#[tokio::test]
async fn test_suggestions_without_token_is_unauthorized() {
    let server = test_server(ScriptedProvider::new()).await;

    let response = AxumTestRequest::post("/api/suggestions")
        .json(&json!({ "newMessageText": "hi", "isDraft": "false" }))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_conversation() {
    let server = test_server(ScriptedProvider::new()).await;

    let response = AxumTestRequest::post("/api/conversations")
        .bearer(&server.token)
        .json(&json!({ "title": "Saturday match" }))
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], TEST_USER);
    assert_eq!(body["title"], "Saturday match");

    let id = body["id"].as_str().unwrap();
    assert!(server
        .database
        .get_conversation(id, TEST_USER)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_health_reports_provider() {
    let server = test_server(ScriptedProvider::new()).await;

    let response = AxumTestRequest::get("/health")
        .send(routes::router(server.resources.clone()))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider"], "scripted");
    assert!(body["provider_reachable"].is_null());
}

async fn health_with_backend(reachable: Result<bool, String>) -> serde_json::Value {
    let server = test_server(ScriptedProvider::new()).await;
    let resources = (*server.resources)
        .clone()
        .with_llm_provider(Arc::new(FixedHealthProvider { reachable }));

    let response = AxumTestRequest::get("/health")
        .send(routes::router(Arc::new(resources)))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn test_health_checks_reachable_backend() {
    let body = health_with_backend(Ok(true)).await;

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["provider_reachable"], true);
}

#[tokio::test]
async fn test_health_reports_unreachable_backend_as_degraded() {
    let refused = health_with_backend(Ok(false)).await;
    assert_eq!(refused["status"], "degraded");
    assert_eq!(refused["provider_reachable"], false);

    let failed = health_with_backend(Err("connection refused".to_owned())).await;
    assert_eq!(failed["status"], "degraded");
    assert_eq!(failed["provider_reachable"], false);
}
