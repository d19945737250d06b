// Copyright (c) 2025 - Cowboy AI, Inc.
//! VmName Value Object with Guest-Hostname Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// VM name validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmNameError {
    #[error("VM name is empty")]
    Empty,

    #[error("VM name exceeds maximum length of 63 characters: {0}")]
    TooLong(usize),

    #[error("Invalid character in VM name: {0}")]
    InvalidCharacter(char),

    #[error("VM name cannot start or end with hyphen: {0}")]
    InvalidFormat(String),

    #[error("VM name cannot be all numeric: {0}")]
    AllNumeric(String),
}

/// Requested machine name value object
///
/// The name becomes the guest hostname of the provisioned VM, so it follows
/// RFC 1123 single-label rules:
/// - Non-empty, length ≤ 63 characters
/// - ASCII alphanumeric and hyphens only
/// - Cannot start or end with a hyphen
/// - Cannot be all numeric
///
/// # Examples
///
/// ```rust
/// use vmdocket::domain::VmName;
///
/// let name = VmName::new("web01-staging").unwrap();
/// assert_eq!(name.as_str(), "web01-staging");
///
/// assert!(VmName::new("").is_err());
/// assert!(VmName::new("-leading").is_err());
/// assert!(VmName::new("trailing-").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VmName(String);

impl VmName {
    /// Maximum length for a guest hostname label (RFC 1123)
    pub const MAX_LENGTH: usize = 63;

    /// Create a new VM name with validation
    pub fn new(name: impl Into<String>) -> Result<Self, VmNameError> {
        let name = name.into();

        if name.is_empty() {
            return Err(VmNameError::Empty);
        }

        if name.len() > Self::MAX_LENGTH {
            return Err(VmNameError::TooLong(name.len()));
        }

        for ch in name.chars() {
            if !ch.is_ascii_alphanumeric() && ch != '-' {
                return Err(VmNameError::InvalidCharacter(ch));
            }
        }

        if name.starts_with('-') || name.ends_with('-') {
            return Err(VmNameError::InvalidFormat(name));
        }

        if name.chars().all(|c| c.is_ascii_digit()) {
            return Err(VmNameError::AllNumeric(name));
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to lowercase (canonical form)
    pub fn to_lowercase(&self) -> Self {
        Self(self.0.to_lowercase())
    }
}

impl fmt::Display for VmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for VmName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VmName {
    type Error = VmNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for VmName {
    type Error = VmNameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
