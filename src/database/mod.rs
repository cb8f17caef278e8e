// ABOUTME: SQLite persistence for conversations, messages, images and user preferences
// ABOUTME: Owns the connection pool and the schema, and implements the pipeline's record stores
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! # Database Management
//!
//! [`SqliteChatStore`] is the production record store and preferences store.
//! The schema is created on connect; every statement is idempotent so
//! restarting against an existing file is safe.

mod chat;

pub use chat::{ConversationRecord, SqliteChatStore};
