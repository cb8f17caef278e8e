// ABOUTME: Re-export of the unified error types from wingman-core
// ABOUTME: Keeps `crate::errors::AppError` paths stable across the server crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

//! Error types live in `wingman-core` so tests and tooling can share them
//! without pulling in the server crate.

pub use wingman_core::errors::*;
