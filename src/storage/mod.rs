// ABOUTME: Collaborator interfaces the analysis pipeline persists through
// ABOUTME: Record store, preferences store and blob store traits with their typed errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Storage collaborators
//!
//! The orchestrator only talks to persistence through these narrow traits.
//! `database::SqliteChatStore` implements the record and preferences stores;
//! [`local::LocalBlobStore`] implements the blob store. Tests inject
//! in-memory doubles.

/// Filesystem-backed blob store
pub mod local;

use async_trait::async_trait;
use thiserror::Error;
use wingman_core::models::{ImageRecord, MessageRecord, UserPreferences};

use crate::errors::AppError;

pub use local::LocalBlobStore;

/// Record store failure
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// Conversation does not exist or is owned by another user
    #[error("conversation does not exist or is not owned by the caller")]
    ForeignKeyViolation,
    /// Any other store failure
    #[error("record store failure: {0}")]
    Other(String),
}

impl From<RecordStoreError> for AppError {
    fn from(error: RecordStoreError) -> Self {
        match error {
            RecordStoreError::ForeignKeyViolation => Self::foreign_key_violation(),
            RecordStoreError::Other(message) => Self::persistence(message),
        }
    }
}

/// Blob store failure
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// The object path escapes the store or is malformed
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    /// Write failed
    #[error("blob upload failed: {0}")]
    Upload(String),
}

impl From<BlobStoreError> for AppError {
    fn from(error: BlobStoreError) -> Self {
        Self::storage(error.to_string())
    }
}

/// Persistence of conversations, messages and image metadata
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist the user's turn before any model call
    ///
    /// # Errors
    ///
    /// [`RecordStoreError::ForeignKeyViolation`] when the conversation is
    /// missing or belongs to someone else
    async fn insert_message_stub(
        &self,
        user_id: &str,
        conversation_id: &str,
        content: Option<&str>,
    ) -> Result<MessageRecord, RecordStoreError>;

    /// Bump the conversation's last-activity timestamp
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    async fn touch_conversation(&self, conversation_id: &str) -> Result<(), RecordStoreError>;

    /// Set the conversation title
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails
    async fn update_conversation_title(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<(), RecordStoreError>;

    /// Attach an image description to a message; `false` on any failure
    async fn update_message_image_description(&self, message_id: &str, description: &str)
        -> bool;

    /// Persist image metadata for one message in a single batch
    ///
    /// # Errors
    ///
    /// Returns an error if the batch insert fails
    async fn insert_image_records(&self, records: &[ImageRecord]) -> Result<(), RecordStoreError>;

    /// Persist the assistant's final reply
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails
    async fn insert_ai_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<MessageRecord, RecordStoreError>;
}

/// Per-user reply preferences
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Preferences for `user_id`, defaults when the user has none
    ///
    /// # Errors
    ///
    /// Only on a real transport failure
    async fn get_preferences(&self, user_id: &str) -> Result<UserPreferences, RecordStoreError>;
}

/// Durable storage for uploaded images
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, returning the stored path
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the write fails
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, BlobStoreError>;

    /// Public URL of a stored object, if the store exposes one
    fn public_url(&self, path: &str) -> Option<String>;
}
