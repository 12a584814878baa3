// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Routing Errors
//!
//! Error taxonomy for the two public coordinator operations.
//!
//! | Error | Raised when | State mutated? |
//! |-------|-------------|----------------|
//! | [`ValidationError`] | Task or outcome input is malformed | never |
//! | [`RouterError::UnknownDecision`] | Outcome reported for a task id that was never issued or was already reported | never |
//! | [`RouterError::CapacityExhausted`] | Specialist capacity reached with nothing evictable | never |
//! | [`RouterError::Persistence`] | A repository write failed | rolled back |
//!
//! "No new approach discovered" is a normal outcome of a discovery pass and
//! is not represented here.

use thiserror::Error;

use super::repository::RepositoryError;

/// Malformed input, rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} out of range: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Field {0} is not a finite number")]
    NotFinite(&'static str),

    #[error("Invalid identifier for {field}: {reason}")]
    InvalidIdentifier { field: &'static str, reason: String },

    #[error("Field {field} too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

impl ValidationError {
    /// Check that `value` is finite and within `[min, max]`.
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite(field));
        }
        if value < min || value > max {
            return Err(Self::OutOfRange { field, value, min, max });
        }
        Ok(value)
    }
}

/// Errors surfaced by the coordinator operations.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Unknown or already reported decision: {task_id}")]
    UnknownDecision { task_id: String },

    #[error("Specialist capacity exhausted (max {max})")]
    CapacityExhausted { max: usize },

    #[error("Persistence failed: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("No active approach available for routing")]
    NoActiveApproach,
}

impl RouterError {
    pub fn unknown_decision(task_id: impl Into<String>) -> Self {
        Self::UnknownDecision {
            task_id: task_id.into(),
        }
    }

    /// True for caller mistakes that left state untouched.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownDecision { .. })
    }
}
