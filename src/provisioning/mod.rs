// Copyright (c) 2025 - Cowboy AI, Inc.
//! Hypervisor Provisioning Port
//!
//! Defines the boundary to the hypervisor backend: the [`HypervisorPort`]
//! trait, the error taxonomy with its retriable/permanent classification,
//! and the progress reporting hooks. The retry layer lives in [`retry`].
//!
//! # Error Classification
//!
//! Every [`VsphereError`] is either retriable (transient infrastructure
//! trouble worth another attempt) or permanent (retrying cannot help).
//! The classification lives here, next to the error type, so the retry
//! layer never pattern-matches on error internals.

pub mod retry;

pub use retry::{ProvisionOutcome, ProvisioningError, ResilientProvisioner, RetryPolicy};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{VmName, VmSize};

/// Specification handed to the hypervisor for a single machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmSpec {
    /// Guest-safe machine name
    pub name: VmName,

    /// Catalogue size determining cpu/ram/disk
    pub size: VmSize,
}

/// Observable stages of a provisioning operation, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStage {
    Queued,
    Cloning,
    Customizing,
    PoweringOn,
    Ready,
}

impl fmt::Display for ProvisioningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisioningStage::Queued => "queued",
            ProvisioningStage::Cloning => "cloning",
            ProvisioningStage::Customizing => "customizing",
            ProvisioningStage::PoweringOn => "powering_on",
            ProvisioningStage::Ready => "ready",
        };
        write!(f, "{name}")
    }
}

/// Callback invoked by the backend as provisioning advances through stages
pub type ProgressFn = Arc<dyn Fn(ProvisioningStage) + Send + Sync>;

/// Successful provisioning outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    /// Hypervisor-side machine reference (operator diagnostics only)
    pub machine_ref: String,
}

/// Errors reported by the hypervisor backend
#[derive(Debug, Clone, Error)]
pub enum VsphereError {
    #[error("connection to hypervisor failed: {0}")]
    ConnectionError(String),

    #[error("hypervisor operation timed out: {0}")]
    Timeout(String),

    #[error("hypervisor API error: {0}")]
    ApiError(String),

    #[error("hypervisor resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("invalid machine configuration: {0}")]
    InvalidConfiguration(String),

    #[error("hypervisor object not found: {0}")]
    ResourceNotFound(String),

    #[error("hypervisor authentication failed: {0}")]
    AuthenticationError(String),

    #[error("hypervisor operation failed: {0}")]
    OperationFailed(String),
}

impl VsphereError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// `OperationFailed` is treated as permanent: the hypervisor accepted
    /// the call and reported a definite failure, so repeating the same call
    /// is expected to fail the same way.
    pub fn is_retriable(&self) -> bool {
        match self {
            VsphereError::ConnectionError(_)
            | VsphereError::Timeout(_)
            | VsphereError::ApiError(_)
            | VsphereError::ResourceExhausted(_) => true,
            VsphereError::InvalidConfiguration(_)
            | VsphereError::ResourceNotFound(_)
            | VsphereError::AuthenticationError(_)
            | VsphereError::OperationFailed(_) => false,
        }
    }

    /// Stable diagnostic code, safe to persist in events
    pub fn error_code(&self) -> ProvisioningErrorCode {
        match self {
            VsphereError::ConnectionError(_) => ProvisioningErrorCode::Connection,
            VsphereError::Timeout(_) => ProvisioningErrorCode::Timeout,
            VsphereError::ApiError(_) => ProvisioningErrorCode::Api,
            VsphereError::ResourceExhausted(_) => ProvisioningErrorCode::ResourceExhausted,
            VsphereError::InvalidConfiguration(_) => ProvisioningErrorCode::InvalidConfiguration,
            VsphereError::ResourceNotFound(_) => ProvisioningErrorCode::NotFound,
            VsphereError::AuthenticationError(_) => ProvisioningErrorCode::Authentication,
            VsphereError::OperationFailed(_) => ProvisioningErrorCode::OperationFailed,
        }
    }

    /// User-safe message with no hypervisor internals
    pub fn user_message(&self) -> &'static str {
        match self {
            VsphereError::ConnectionError(_)
            | VsphereError::Timeout(_)
            | VsphereError::ApiError(_) => {
                "Provisioning is temporarily unavailable; your request will be retried"
            }
            VsphereError::ResourceExhausted(_) => {
                "The platform is out of capacity; please try again later"
            }
            VsphereError::InvalidConfiguration(_) => {
                "The requested machine configuration was rejected"
            }
            VsphereError::ResourceNotFound(_) => {
                "A required platform resource is missing; contact support"
            }
            VsphereError::AuthenticationError(_) => {
                "The platform could not authenticate with the hypervisor; contact support"
            }
            VsphereError::OperationFailed(_) => "Provisioning failed; contact support",
        }
    }
}

/// Stable diagnostic codes persisted in failure events.
///
/// Raw hypervisor messages never reach events or users; only these codes do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningErrorCode {
    Connection,
    Timeout,
    Api,
    ResourceExhausted,
    InvalidConfiguration,
    NotFound,
    Authentication,
    OperationFailed,
}

impl fmt::Display for ProvisioningErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProvisioningErrorCode::Connection => "connection",
            ProvisioningErrorCode::Timeout => "timeout",
            ProvisioningErrorCode::Api => "api",
            ProvisioningErrorCode::ResourceExhausted => "resource_exhausted",
            ProvisioningErrorCode::InvalidConfiguration => "invalid_configuration",
            ProvisioningErrorCode::NotFound => "not_found",
            ProvisioningErrorCode::Authentication => "authentication",
            ProvisioningErrorCode::OperationFailed => "operation_failed",
        };
        write!(f, "{name}")
    }
}

/// Hypervisor backend port.
///
/// A single attempt with no retry semantics; resilience is layered on top
/// by [`ResilientProvisioner`]. Implementations report stage transitions
/// through `progress` as the operation advances.
#[async_trait]
pub trait HypervisorPort: Send + Sync {
    async fn create_vm(
        &self,
        spec: &VmSpec,
        progress: ProgressFn,
    ) -> Result<ProvisioningResult, VsphereError>;
}
