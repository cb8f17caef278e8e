// ABOUTME: Main library entry point for the Wingman reply-orchestration server
// ABOUTME: Streams LLM reply drafts for chat apps with enrichment, critique and persistence
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

#![deny(unsafe_code)]

//! # Wingman Server
//!
//! Takes a chat history plus an optional new message and screenshots,
//! generates a suggested reply through an OpenAI-compatible completion
//! provider, streams it to the client as Server-Sent Events, then runs a
//! second-pass critique and persists the result.
//!
//! ## Architecture
//!
//! - **analysis**: parsing, stage classification, prompt assembly, enrichment,
//!   critique and the per-request orchestrator
//! - **llm**: provider abstraction, SSE chunk parsing and prompt templates
//! - **storage**: record, preference and blob store traits
//! - **database**: `SQLite` implementation of the record and preference stores
//! - **media**: image downscaling before vision calls and upload
//! - **routes**: the axum HTTP surface

/// Reply orchestration pipeline
pub mod analysis;

/// Environment-driven configuration
pub mod config;

/// `SQLite` chat store
pub mod database;

/// Unified error handling
pub mod errors;

/// LLM provider abstraction and prompt templates
pub mod llm;

/// Structured logging setup
pub mod logging;

/// Image compression
pub mod media;

/// Bearer-token authentication
pub mod middleware;

/// Shared handler state
pub mod resources;

/// HTTP routes
pub mod routes;

/// Record, preference and blob store seams
pub mod storage;

pub use wingman_core::constants;
pub use wingman_core::models;
