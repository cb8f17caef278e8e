// ABOUTME: Per-step result type separating completed, degraded and fatal pipeline steps
// ABOUTME: Lets the orchestrator state which failures abort the request and which only log
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use tracing::{error, warn};

use crate::errors::{AppError, AppResult};

/// Result of one pipeline sub-operation
#[derive(Debug)]
pub enum StepOutcome<T> {
    /// The step did what it was asked
    Completed(T),
    /// The step failed but produced a usable fallback
    Degraded {
        /// Fallback value
        value: T,
        /// What went wrong
        reason: String,
    },
    /// The step failed and the request must stop
    Fatal(AppError),
}

impl<T> StepOutcome<T> {
    /// Degraded outcome
    #[must_use]
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    /// Best-effort step: an error degrades to `fallback`
    #[must_use]
    pub fn best_effort<E: std::fmt::Display>(result: Result<T, E>, fallback: T) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(e) => Self::degraded(fallback, e.to_string()),
        }
    }

    /// Required step: an error is fatal
    #[must_use]
    pub fn required(result: AppResult<T>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(e) => Self::Fatal(e),
        }
    }

    /// Whether the step fell back to a default
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Unwrap into a result, logging degradation and failure against `step`
    ///
    /// # Errors
    ///
    /// Returns the error of a fatal outcome
    pub fn into_result(self, step: &str) -> AppResult<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Degraded { value, reason } => {
                warn!(step, %reason, "Step degraded, continuing with fallback");
                Ok(value)
            }
            Self::Fatal(e) => {
                error!(step, code = ?e.code, error = %e, "Step failed, aborting request");
                Err(e)
            }
        }
    }
}
