// ABOUTME: Unified error taxonomy for the reply-orchestration pipeline
// ABOUTME: Maps pipeline failure classes to stable error codes and HTTP status codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Unified Error Handling System
//!
//! Every failure that can leave the analysis pipeline before the response
//! stream opens is expressed as an [`AppError`] carrying an [`ErrorCode`].
//! The code decides the HTTP status and the machine-readable identifier the
//! client sees; the message is human readable.
//!
//! Parse-class conditions (malformed model output) are deliberately absent:
//! they always degrade to documented defaults and never surface as errors.

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes used throughout the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No resolved user identity accompanied the request
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    /// Malformed or missing request fields, invalid stage, bad history JSON
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
    /// The referenced conversation does not exist or is not owned by the caller
    #[serde(rename = "FOREIGN_KEY_VIOLATION")]
    ForeignKeyViolation,
    /// Generic record store failure
    #[serde(rename = "PERSISTENCE_ERROR")]
    PersistenceError,
    /// Blob storage or image-record batch failure
    #[serde(rename = "STORAGE_ERROR")]
    StorageError,
    /// Completion provider transport, timeout or empty-response failure
    #[serde(rename = "PROVIDER_ERROR")]
    ProviderError,
    /// Missing or invalid configuration
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
    /// Anything else
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::ValidationError | Self::ForeignKeyViolation => 400,
            Self::Unauthorized => 401,
            Self::ProviderError => 502,
            Self::PersistenceError | Self::StorageError | Self::ConfigError | Self::InternalError => {
                500
            }
        }
    }

    /// Short description used as the `Display` prefix
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Authentication is required",
            Self::ValidationError => "The request is invalid",
            Self::ForeignKeyViolation => "The referenced conversation is invalid",
            Self::PersistenceError => "Record store operation failed",
            Self::StorageError => "Storage operation failed",
            Self::ProviderError => "Completion provider failed",
            Self::ConfigError => "Configuration error",
            Self::InternalError => "An internal server error occurred",
        }
    }

    /// Stable identifier as serialized on the wire
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            Self::PersistenceError => "PERSISTENCE_ERROR",
            Self::StorageError => "STORAGE_ERROR",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the service
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Missing identity
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Invalid request payload
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// Conversation missing or owned by someone else
    #[must_use]
    pub fn foreign_key_violation() -> Self {
        Self::new(ErrorCode::ForeignKeyViolation, "Invalid conversation ID")
    }

    /// Record store failure
    #[must_use]
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistenceError, message)
    }

    /// Blob storage failure
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Completion provider failure, prefixed with the provider name
    #[must_use]
    pub fn provider(provider: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ProviderError, format!("{provider}: {message}"))
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorResponseDetails,
}

/// Inner error details of [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message.clone(),
            },
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("Serialization failed: {error}")).with_source(error)
    }
}

#[cfg(feature = "http-response")]
mod http_response {
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use http::StatusCode;

    use super::{AppError, ErrorResponse};

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                tracing::error!(code = %self.code, "{}", self);
            } else {
                tracing::debug!(code = %self.code, "{}", self);
            }
            (status, Json(ErrorResponse::from(&self))).into_response()
        }
    }
}
