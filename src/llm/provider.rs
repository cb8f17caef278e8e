// ABOUTME: Runtime selection of the configured completion backend
// ABOUTME: Builds OpenAI, Groq or local providers from config with an initialisation fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # LLM Provider Selector
//!
//! `WINGMAN_LLM_PROVIDER` picks the backend (`openai` by default, `groq`,
//! `local`). When the primary cannot be built (typically a missing API key)
//! and `WINGMAN_LLM_FALLBACK_PROVIDER` names a different backend, that one is
//! used instead. There is no per-request retry.

use async_trait::async_trait;
use tracing::{info, warn};

use super::{
    ChatRequest, ChatResponse, ChatStream, LlmCapabilities, LlmProvider, OpenAiCompatibleConfig,
    OpenAiCompatibleProvider,
};
use super::openai_compatible::LOCAL_BASE_URL;
use crate::config::{LlmConfig, LlmProviderType};
use crate::errors::{AppError, AppResult};

/// Unified chat provider over the supported backends
pub enum ChatProvider {
    /// Hosted `OpenAI`
    OpenAi(OpenAiCompatibleProvider),
    /// Groq
    Groq(OpenAiCompatibleProvider),
    /// Local `OpenAI`-compatible server
    Local(OpenAiCompatibleProvider),
}

impl ChatProvider {
    /// Create a provider from environment configuration
    ///
    /// # Errors
    ///
    /// Returns an error if neither the primary nor the fallback provider can
    /// be initialised
    pub fn from_env() -> AppResult<Self> {
        Self::from_config(&LlmConfig::from_env()?)
    }

    /// Create a provider from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns a config error if the selected provider lacks credentials and
    /// no usable fallback is configured
    pub fn from_config(config: &LlmConfig) -> AppResult<Self> {
        info!(
            "Initializing LLM provider: {} (set {} to change)",
            config.provider,
            LlmProviderType::ENV_VAR
        );

        match Self::create(config.provider, config) {
            Ok(provider) => Ok(provider),
            Err(primary_error) => {
                let Some(fallback) = config
                    .fallback_provider
                    .filter(|fallback| *fallback != config.provider)
                else {
                    return Err(primary_error);
                };

                warn!(
                    "Primary provider {} failed to initialise ({primary_error}), trying {fallback}",
                    config.provider
                );
                Self::create(fallback, config).map_err(|fallback_error| {
                    AppError::config(format!(
                        "Both primary ({}) and fallback ({fallback}) providers failed. \
                         Primary: {primary_error}. Fallback: {fallback_error}",
                        config.provider
                    ))
                })
            }
        }
    }

    fn create(provider_type: LlmProviderType, config: &LlmConfig) -> AppResult<Self> {
        let missing_key = |var: &str| AppError::config(format!("{var} must be set for {provider_type}"));

        let preset = match provider_type {
            LlmProviderType::OpenAi => OpenAiCompatibleConfig::openai(
                config
                    .openai_api_key
                    .clone()
                    .ok_or_else(|| missing_key("OPENAI_API_KEY"))?,
            ),
            LlmProviderType::Groq => OpenAiCompatibleConfig::groq(
                config
                    .groq_api_key
                    .clone()
                    .ok_or_else(|| missing_key("GROQ_API_KEY"))?,
            ),
            LlmProviderType::Local => OpenAiCompatibleConfig::local(
                config
                    .local_base_url
                    .clone()
                    .unwrap_or_else(|| LOCAL_BASE_URL.to_owned()),
                config.local_api_key.clone(),
            ),
        };

        let preset = match &config.model {
            Some(model) => preset.with_model(model.clone()),
            None => preset,
        }
        .with_timeout(config.request_timeout);

        let provider = OpenAiCompatibleProvider::new(preset)?;
        Ok(match provider_type {
            LlmProviderType::OpenAi => Self::OpenAi(provider),
            LlmProviderType::Groq => Self::Groq(provider),
            LlmProviderType::Local => Self::Local(provider),
        })
    }

    const fn inner(&self) -> &OpenAiCompatibleProvider {
        match self {
            Self::OpenAi(p) | Self::Groq(p) | Self::Local(p) => p,
        }
    }
}

#[async_trait]
impl LlmProvider for ChatProvider {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn display_name(&self) -> &'static str {
        self.inner().display_name()
    }

    fn capabilities(&self) -> LlmCapabilities {
        self.inner().capabilities()
    }

    fn default_model(&self) -> &str {
        self.inner().default_model()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.inner().complete(request).await
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        self.inner().complete_stream(request).await
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        self.inner().health_check().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(provider: LlmProviderType) -> LlmConfig {
        LlmConfig {
            provider,
            model: None,
            fallback_provider: None,
            openai_api_key: None,
            groq_api_key: None,
            local_base_url: None,
            local_api_key: None,
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_missing_key_without_fallback_fails() {
        let Err(error) = ChatProvider::from_config(&config(LlmProviderType::OpenAi)) else {
            panic!("expected config error");
        };
        assert!(error.message.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_falls_back_to_local() {
        let mut cfg = config(LlmProviderType::Groq);
        cfg.fallback_provider = Some(LlmProviderType::Local);
        cfg.model = Some("llama3.1:8b".to_owned());
        let provider = ChatProvider::from_config(&cfg).unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(provider.default_model(), "llama3.1:8b");
    }
}
