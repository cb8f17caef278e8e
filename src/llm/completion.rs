// ABOUTME: Narrow completion contract consumed by the analysis pipeline
// ABOUTME: Blocking full-text completion and callback-driven streaming over any LlmProvider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use tracing::debug;

use super::{ChatMessage, ChatRequest, LlmProvider};
use crate::errors::{AppError, AppResult};

/// Per-call generation hints
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CompletionOptions {
    /// Output length hint
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionOptions {
    /// Options with only an output length hint
    #[must_use]
    pub const fn max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            temperature: None,
        }
    }

    /// Set the sampling temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text-generation backend as seen by the pipeline
///
/// Both calls take role-tagged messages whose content may mix text and
/// images. Failures are `ProviderError`s.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate the full reply
    ///
    /// # Errors
    ///
    /// Fails on transport, timeout or invalid-response errors, and when the
    /// backend returns no usable text.
    async fn complete(&self, messages: &[ChatMessage], options: CompletionOptions)
        -> AppResult<String>;

    /// Stream the reply, calling `on_chunk` once per fragment in arrival order
    ///
    /// # Errors
    ///
    /// Fails if the stream cannot be opened, errors mid-way, or ends without
    /// the backend signalling completion.
    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> AppResult<()>;
}

/// Adapts an [`LlmProvider`] to [`CompletionProvider`]
#[derive(Clone)]
pub struct LlmCompletionProvider {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
}

impl LlmCompletionProvider {
    /// Wrap a provider, using its default model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            model: None,
        }
    }

    /// Pin every call to a specific model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Underlying provider
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    fn request(&self, messages: &[ChatMessage]) -> ChatRequest {
        let request = ChatRequest::new(messages.to_vec());
        match &self.model {
            Some(model) => request.with_model(model.clone()),
            None => request,
        }
    }
}

#[async_trait]
impl CompletionProvider for LlmCompletionProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> AppResult<String> {
        let mut request = self.request(messages);
        request.max_tokens = options.max_tokens;
        request.temperature = options.temperature;

        let response = self.provider.complete(&request).await?;
        if response.content.trim().is_empty() {
            return Err(AppError::provider(
                self.provider.display_name(),
                "response contained no text",
            ));
        }
        Ok(response.content)
    }

    async fn stream_complete(
        &self,
        messages: &[ChatMessage],
        on_chunk: &mut (dyn for<'c> FnMut(&'c str) + Send),
    ) -> AppResult<()> {
        let request = self.request(messages).with_streaming();
        let mut stream = self.provider.complete_stream(&request).await?;

        let mut fragments = 0_usize;
        let mut finished = false;
        while let Some(item) = stream.next().await {
            let chunk = item?;
            if !chunk.delta.is_empty() {
                fragments += 1;
                on_chunk(&chunk.delta);
            }
            if chunk.is_final {
                finished = true;
                break;
            }
        }

        if !finished {
            return Err(AppError::provider(
                self.provider.display_name(),
                "stream ended before completion",
            ));
        }

        debug!(
            provider = self.provider.name(),
            fragments, "Streaming completion finished"
        );
        Ok(())
    }
}
