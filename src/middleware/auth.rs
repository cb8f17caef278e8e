// ABOUTME: Bearer-token identity resolution for the analysis endpoints
// ABOUTME: Issues and validates HS256 JWTs and maps a request's headers to an authenticated user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use chrono::{Duration, Utc};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};

/// Default lifetime of issued tokens
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// `JWT` validation failure
#[derive(Debug, Clone, Error)]
pub enum JwtValidationError {
    /// Token has expired
    #[error("JWT token has expired")]
    TokenExpired,
    /// Signature or claims are invalid
    #[error("JWT token is invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Not a `JWT`
    #[error("JWT token is malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl From<&jsonwebtoken::errors::Error> for JwtValidationError {
    fn from(e: &jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidToken => Self::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => Self::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => Self::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            _ => Self::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }
}

/// `JWT` claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

/// Identity resolved from a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User ID
    pub user_id: String,
}

/// HS256 token issuer and validator
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: Duration,
}

impl AuthManager {
    /// Create a manager from a shared secret
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
        }
    }

    /// Override the lifetime of issued tokens
    #[must_use]
    pub const fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    /// Issue a token for `user_id`
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails
    pub fn generate_token(&self, user_id: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Validate a token and return its claims
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] for expired, forged or malformed tokens
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| JwtValidationError::from(&e))
    }

    /// Resolve the caller from an `Authorization: Bearer` header
    ///
    /// Missing, malformed and invalid credentials all resolve to `None`; the
    /// pipeline turns that into `Unauthorized`.
    #[must_use]
    pub fn resolve(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let Some(token) = header.strip_prefix("Bearer ") else {
            debug!("Authorization header is not a bearer token");
            return None;
        };

        match self.validate_token(token.trim()) {
            Ok(claims) if !claims.sub.trim().is_empty() => Some(AuthenticatedUser {
                user_id: claims.sub,
            }),
            Ok(_) => {
                warn!("Bearer token has an empty subject");
                None
            }
            Err(e) => {
                warn!(error = %e, "Bearer token rejected");
                None
            }
        }
    }
}
