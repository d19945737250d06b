// Copyright (c) 2025 - Cowboy AI, Inc.
//! Reason Value Object
//!
//! Free-text reasons (request justification, rejection reason) must be
//! substantial enough to be useful and bounded enough to store: length
//! 10..=500 characters, both boundaries inclusive.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reason validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReasonError {
    #[error("reason too short: {0} characters (minimum {min})", min = Reason::MIN_LENGTH)]
    TooShort(usize),

    #[error("reason too long: {0} characters (maximum {max})", max = Reason::MAX_LENGTH)]
    TooLong(usize),
}

/// Validated free-text reason
///
/// # Examples
///
/// ```rust
/// use vmdocket::domain::Reason;
///
/// assert!(Reason::new("CI build agents for team X").is_ok());
/// assert!(Reason::new("too short").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reason(String);

impl Reason {
    /// Minimum reason length in characters (inclusive)
    pub const MIN_LENGTH: usize = 10;

    /// Maximum reason length in characters (inclusive)
    pub const MAX_LENGTH: usize = 500;

    /// Create a new reason with length validation
    pub fn new(reason: impl Into<String>) -> Result<Self, ReasonError> {
        let reason = reason.into();
        let length = reason.chars().count();

        if length < Self::MIN_LENGTH {
            return Err(ReasonError::TooShort(length));
        }

        if length > Self::MAX_LENGTH {
            return Err(ReasonError::TooLong(length));
        }

        Ok(Self(reason))
    }

    /// Get the reason as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Reason {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Reason {
    type Error = ReasonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Reason {
    type Error = ReasonError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
