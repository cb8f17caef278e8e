// ABOUTME: OpenAI-compatible chat completions client covering OpenAI, Groq and local servers
// ABOUTME: Sends text or vision messages, parses blocking and SSE streaming responses
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # `OpenAI`-Compatible Provider
//!
//! One implementation serves every backend speaking the `/chat/completions`
//! dialect. Presets fix the base URL, default model and capabilities:
//!
//! - **`OpenAI`**: <https://api.openai.com/v1>, vision-capable
//! - **Groq**: <https://api.groq.com/openai/v1>
//! - **Local** (Ollama, vLLM, `LocalAI`): <http://localhost:11434/v1> by default
//!
//! Every request carries a hard timeout so a stalled backend surfaces as a
//! `ProviderError` instead of hanging the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::sse_parser::create_sse_stream;
use super::{
    ChatMessage, ChatRequest, ChatResponse, ChatStream, LlmCapabilities, LlmProvider, StreamChunk,
    TokenUsage,
};
use crate::errors::AppError;

// ============================================================================
// Configuration Constants
// ============================================================================

/// `OpenAI` API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Groq API base URL
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default local base URL (Ollama)
pub const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
const GROQ_DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const LOCAL_DEFAULT_MODEL: &str = "qwen2.5:14b-instruct";

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    usage: Option<ResponseUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for an `OpenAI`-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// Base URL up to and including the version segment
    pub base_url: String,
    /// Bearer token, optional for local servers
    pub api_key: Option<String>,
    /// Model used when the request does not name one
    pub default_model: String,
    /// Provider identifier for logs and errors
    pub provider_name: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// What the backend can do
    pub capabilities: LlmCapabilities,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl OpenAiCompatibleConfig {
    /// Preset for the hosted `OpenAI` API
    #[must_use]
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_owned(),
            api_key: Some(api_key.into()),
            default_model: OPENAI_DEFAULT_MODEL.to_owned(),
            provider_name: "openai",
            display_name: "OpenAI",
            capabilities: LlmCapabilities::multimodal(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Preset for Groq's `OpenAI`-compatible endpoint
    #[must_use]
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_owned(),
            api_key: Some(api_key.into()),
            default_model: GROQ_DEFAULT_MODEL.to_owned(),
            provider_name: "groq",
            display_name: "Groq",
            capabilities: LlmCapabilities::multimodal(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Preset for a local server (Ollama, vLLM, `LocalAI`)
    #[must_use]
    pub fn local(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
            default_model: LOCAL_DEFAULT_MODEL.to_owned(),
            provider_name: "local",
            display_name: "Local LLM",
            capabilities: LlmCapabilities::text_only(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Declare vision support (for local multimodal models)
    #[must_use]
    pub fn with_vision(mut self) -> Self {
        self.capabilities |= LlmCapabilities::VISION;
        self
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Client for any `/chat/completions` endpoint
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a provider
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OpenAiCompatibleConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {e}")))?;

        info!(
            provider = config.provider_name,
            base_url = %config.base_url,
            model = %config.default_model,
            "Initialized {} provider",
            config.display_name
        );

        Ok(Self { client, config })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &OpenAiCompatibleConfig {
        &self.config
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn error(&self, message: impl std::fmt::Display) -> AppError {
        AppError::provider(self.config.display_name, message)
    }

    fn check_vision(&self, request: &ChatRequest) -> Result<(), AppError> {
        if request.has_images() && !self.config.capabilities.supports_vision() {
            return Err(self.error(format!(
                "model {} does not accept image input",
                self.model_for(request)
            )));
        }
        Ok(())
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        request
            .model
            .as_deref()
            .unwrap_or(&self.config.default_model)
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response, AppError> {
        self.check_vision(request)?;

        let body = CompletionsRequest {
            model: self.model_for(request),
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        debug!(
            provider = self.config.provider_name,
            messages = request.messages.len(),
            stream,
            "Sending chat completion request"
        );

        let response = self
            .authorize(self.client.post(self.api_url("chat/completions")))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = self.config.provider_name, "Request failed: {e}");
                if e.is_timeout() {
                    self.error("request timed out")
                } else if e.is_connect() {
                    self.error(format!("cannot connect to {}", self.config.base_url))
                } else {
                    self.error(format!("failed to send request: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.status_error(status, &body))
    }

    fn status_error(&self, status: StatusCode, body: &str) -> AppError {
        let detail = serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |envelope| envelope.error.message,
        );
        warn!(provider = self.config.provider_name, %status, "API error: {detail}");
        self.error(format!("API error ({status}): {detail}"))
    }

    fn parse_stream_payload(payload: &str) -> Option<Result<StreamChunk, AppError>> {
        let parsed = match serde_json::from_str::<StreamPayload>(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Skipping unparseable stream payload: {e}");
                return None;
            }
        };
        let choice = parsed.choices.into_iter().next()?;
        Some(Ok(StreamChunk {
            delta: choice.delta.content.unwrap_or_default(),
            is_final: choice.finish_reason.is_some(),
            finish_reason: choice.finish_reason,
        }))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        self.config.provider_name
    }

    fn display_name(&self) -> &'static str {
        self.config.display_name
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.config.capabilities
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(provider = self.config.provider_name, model = %self.model_for(request)))]
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        let response = self.send(request, false).await?;
        let body = response
            .text()
            .await
            .map_err(|e| self.error(format!("failed to read response: {e}")))?;

        let parsed: CompletionsResponse = serde_json::from_str(&body)
            .map_err(|e| self.error(format!("failed to parse response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| self.error("API returned no choices"))?;

        let content = choice.message.content.unwrap_or_default();
        debug!(
            chars = content.len(),
            finish_reason = ?choice.finish_reason,
            "Received completion"
        );

        Ok(ChatResponse {
            content,
            model: parsed.model,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    #[instrument(skip(self, request), fields(provider = self.config.provider_name, model = %self.model_for(request)))]
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        let response = self.send(request, true).await?;
        Ok(create_sse_stream(
            response.bytes_stream(),
            Self::parse_stream_payload,
            self.config.display_name,
        ))
    }

    #[instrument(skip(self), fields(provider = self.config.provider_name))]
    async fn health_check(&self) -> Result<bool, AppError> {
        let response = self
            .authorize(self.client.get(self.api_url("models")))
            .send()
            .await
            .map_err(|e| self.error(format!("health check failed: {e}")))?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!(status = %response.status(), "Health check failed");
        }
        Ok(healthy)
    }
}
