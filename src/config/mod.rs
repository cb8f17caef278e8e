// ABOUTME: Configuration module for the reply-orchestration server
// ABOUTME: Environment-driven settings plus shared configuration enums
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! Configuration management
//!
//! All settings come from environment variables; there are no config files.
//! Prompt templates are configuration too but are loaded by
//! [`crate::llm::PromptTemplates`].

/// Environment variable parsing and the server configuration struct
pub mod environment;
/// Shared configuration enums
pub mod types;

pub use environment::{BlobStorageConfig, ImageConfig, LlmConfig, ServerConfig};
pub use types::{Environment, LlmProviderType};
