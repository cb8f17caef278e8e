// ABOUTME: HTTP middleware for request identity
// ABOUTME: Resolves bearer tokens into the authenticated user the analysis pipeline requires

/// Bearer-token authentication
pub mod auth;

pub use auth::{AuthManager, AuthenticatedUser, Claims, JwtValidationError};
