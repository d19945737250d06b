// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resilient Provisioning Layer
//!
//! Wraps a [`HypervisorPort`] with bounded retries: exponential backoff with
//! jitter for retriable errors, immediate failure for permanent ones, and a
//! per-attempt timeout so a hung backend call cannot stall the saga.
//!
//! ```text
//! attempt 1 ──err(retriable)──▶ sleep(b₁) ──▶ attempt 2 ── ... ──▶ attempt N
//!     │                                                               │
//!   err(permanent)                                              RetryExhausted
//!     ▼
//!  Permanent
//! ```

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    HypervisorPort, ProgressFn, ProvisioningErrorCode, ProvisioningResult, VmSpec, VsphereError,
};

/// Retry parameters for provisioning attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first)
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles each retry
    pub initial_backoff: Duration,

    /// Backoff ceiling
    pub max_backoff: Duration,

    /// Wall-clock limit for a single backend call
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            attempt_timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the given retry (1-based retry index), jittered.
    ///
    /// Jitter spreads concurrent retries so a backend recovering from an
    /// outage is not hit by every waiting saga at once.
    fn backoff_for(&self, retry: u32) -> Duration {
        let base = self
            .initial_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
            .min(self.max_backoff);
        let jitter_ms = base.as_millis() as u64 / 4;
        if jitter_ms == 0 {
            return base;
        }
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        base + Duration::from_millis(jitter)
    }
}

/// Final outcome of a provisioning operation that did not succeed
#[derive(Debug, Clone, Error)]
pub enum ProvisioningError {
    /// A permanent error ended the operation; no further attempts were made
    #[error("provisioning failed permanently on attempt {attempts}: {last_error}")]
    Permanent {
        attempts: u32,
        last_error: VsphereError,
    },

    /// Every allowed attempt failed with a retriable error
    #[error("provisioning retries exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted {
        attempts: u32,
        last_error: VsphereError,
    },
}

impl ProvisioningError {
    pub fn attempts(&self) -> u32 {
        match self {
            ProvisioningError::Permanent { attempts, .. } => *attempts,
            ProvisioningError::RetryExhausted { attempts, .. } => *attempts,
        }
    }

    pub fn error_code(&self) -> ProvisioningErrorCode {
        match self {
            ProvisioningError::Permanent { last_error, .. } => last_error.error_code(),
            ProvisioningError::RetryExhausted { last_error, .. } => last_error.error_code(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ProvisioningError::Permanent { last_error, .. } => last_error.user_message(),
            ProvisioningError::RetryExhausted { last_error, .. } => last_error.user_message(),
        }
    }
}

/// Successful provisioning, annotated with the attempt count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub result: ProvisioningResult,
    pub attempts: u32,
}

/// Retrying wrapper around a hypervisor backend
pub struct ResilientProvisioner<H: HypervisorPort> {
    backend: Arc<H>,
    policy: RetryPolicy,
}

impl<H: HypervisorPort> ResilientProvisioner<H> {
    pub fn new(backend: Arc<H>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Create a VM, retrying retriable failures up to the policy limit.
    ///
    /// A per-attempt timeout converts a hung call into a retriable
    /// [`VsphereError::Timeout`].
    pub async fn create_vm(
        &self,
        spec: &VmSpec,
        progress: ProgressFn,
    ) -> Result<ProvisionOutcome, ProvisioningError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let call = self.backend.create_vm(spec, Arc::clone(&progress));
            let result = match tokio::time::timeout(self.policy.attempt_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(VsphereError::Timeout(format!(
                    "attempt exceeded {:?}",
                    self.policy.attempt_timeout
                ))),
            };

            match result {
                Ok(result) => {
                    info!(
                        vm_name = %spec.name,
                        attempts = attempt,
                        machine_ref = %result.machine_ref,
                        "VM provisioned"
                    );
                    return Ok(ProvisionOutcome {
                        result,
                        attempts: attempt,
                    });
                }
                Err(err) if !err.is_retriable() => {
                    warn!(
                        vm_name = %spec.name,
                        attempts = attempt,
                        error = %err,
                        "provisioning failed permanently"
                    );
                    return Err(ProvisioningError::Permanent {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                Err(err) if attempt >= self.policy.max_attempts => {
                    warn!(
                        vm_name = %spec.name,
                        attempts = attempt,
                        error = %err,
                        "provisioning retries exhausted"
                    );
                    return Err(ProvisioningError::RetryExhausted {
                        attempts: attempt,
                        last_error: err,
                    });
                }
                Err(err) => {
                    let backoff = self.policy.backoff_for(attempt);
                    warn!(
                        vm_name = %spec.name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "provisioning attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}
