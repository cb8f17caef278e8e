// ABOUTME: Core types and constants for the Wingman reply-orchestration service
// ABOUTME: Foundation crate with error handling, domain models and fallback constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

#![deny(unsafe_code)]

//! # Wingman Core
//!
//! Foundation crate shared by the server and its tests. It changes rarely,
//! which keeps incremental builds of the server crate fast.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode` and the HTTP error body
//! - **models**: stage, intent, history turns, records and per-request value objects
//! - **constants**: fallback strings and token hints

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Domain models for conversations and analysis requests
pub mod models;
