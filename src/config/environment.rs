// ABOUTME: Environment-driven server configuration
// ABOUTME: Reads ports, database URL, blob storage, auth secret, LLM, prompt and image settings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! Environment-based configuration management

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use super::types::{Environment, LlmProviderType};
use crate::errors::{AppError, AppResult};

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8081;
/// Default SQLite URL
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/wingman.db";
/// Default blob storage root
pub const DEFAULT_BLOB_STORAGE_DIR: &str = "./data/uploads";
/// Default request body limit (20 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
/// Default longest image edge after compression
pub const DEFAULT_IMAGE_MAX_DIMENSION: u32 = 1536;
/// Default JPEG quality after compression
pub const DEFAULT_IMAGE_JPEG_QUALITY: u8 = 80;
/// Default LLM request timeout
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Read and parse an environment variable, using `default` when unset or empty
///
/// # Errors
///
/// Returns a config error when the variable is set but does not parse
pub fn env_parse_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {key} value '{value}': {e}"))),
        _ => Ok(default),
    }
}

fn env_string_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_owned())
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

/// Completion backend settings
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Primary provider
    pub provider: LlmProviderType,
    /// Model override for every call
    pub model: Option<String>,
    /// Provider tried when the primary cannot be initialised
    pub fallback_provider: Option<LlmProviderType>,
    /// `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,
    /// `GROQ_API_KEY`
    pub groq_api_key: Option<String>,
    /// `LOCAL_LLM_BASE_URL`
    pub local_base_url: Option<String>,
    /// `LOCAL_LLM_API_KEY`
    pub local_api_key: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl LlmConfig {
    /// Load from environment
    ///
    /// # Errors
    ///
    /// Returns a config error for an unparseable timeout
    pub fn from_env() -> AppResult<Self> {
        Ok(Self {
            provider: LlmProviderType::from_env(),
            model: LlmProviderType::model_from_env(),
            fallback_provider: LlmProviderType::fallback_provider_from_env(),
            openai_api_key: env_optional("OPENAI_API_KEY"),
            groq_api_key: env_optional("GROQ_API_KEY"),
            local_base_url: env_optional("LOCAL_LLM_BASE_URL"),
            local_api_key: env_optional("LOCAL_LLM_API_KEY"),
            request_timeout: Duration::from_secs(env_parse_or(
                "LLM_REQUEST_TIMEOUT_SECS",
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
        })
    }
}

/// Blob storage settings
#[derive(Debug, Clone)]
pub struct BlobStorageConfig {
    /// Root directory of the local blob store
    pub root_dir: PathBuf,
    /// Base URL under which stored blobs are publicly served
    pub public_base_url: Option<String>,
}

/// Image compression settings
#[derive(Debug, Clone, Copy)]
pub struct ImageConfig {
    /// Longest edge after downscaling
    pub max_dimension: u32,
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_IMAGE_MAX_DIMENSION,
            jpeg_quality: DEFAULT_IMAGE_JPEG_QUALITY,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deployment environment
    pub environment: Environment,
    /// Listen port
    pub http_port: u16,
    /// `SQLite` connection URL
    pub database_url: String,
    /// HS256 secret for bearer tokens
    pub jwt_secret: String,
    /// Blob storage
    pub blob_storage: BlobStorageConfig,
    /// Completion backend
    pub llm: LlmConfig,
    /// Directory overriding built-in prompt templates
    pub prompts_dir: Option<PathBuf>,
    /// Request body limit
    pub max_upload_bytes: usize,
    /// Image compression
    pub image: ImageConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns a config error when `JWT_SECRET` is missing or a numeric
    /// variable does not parse
    pub fn from_env() -> AppResult<Self> {
        let environment =
            Environment::from_str_or_default(&env_string_or("ENVIRONMENT", "development"));

        let jwt_secret = env_optional("JWT_SECRET")
            .ok_or_else(|| AppError::config("JWT_SECRET must be set"))?;
        if jwt_secret.len() < 32 {
            warn!("JWT_SECRET is shorter than 32 bytes");
        }

        let image = ImageConfig {
            max_dimension: env_parse_or("IMAGE_MAX_DIMENSION", DEFAULT_IMAGE_MAX_DIMENSION)?,
            jpeg_quality: env_parse_or("IMAGE_JPEG_QUALITY", DEFAULT_IMAGE_JPEG_QUALITY)?
                .clamp(1, 100),
        };

        Ok(Self {
            environment,
            http_port: env_parse_or("HTTP_PORT", DEFAULT_HTTP_PORT)?,
            database_url: env_string_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            jwt_secret,
            blob_storage: BlobStorageConfig {
                root_dir: PathBuf::from(env_string_or(
                    "BLOB_STORAGE_DIR",
                    DEFAULT_BLOB_STORAGE_DIR,
                )),
                public_base_url: env_optional("BLOB_PUBLIC_BASE_URL"),
            },
            llm: LlmConfig::from_env()?,
            prompts_dir: env_optional("PROMPTS_DIR").map(PathBuf::from),
            max_upload_bytes: env_parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            image,
        })
    }
}
