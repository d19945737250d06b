// Copyright (c) 2025 - Cowboy AI, Inc.
//! Vm Domain Events
//!
//! The Vm aggregate tracks the hypervisor-side provisioning sub-lifecycle in
//! its own stream, linked to the originating request by `request_id`.
//! Provisioning retries and hypervisor state are orthogonal to approval-side
//! state; a separate stream keeps them off the request's optimistic-lock
//! version counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{VmId, VmName, VmRequestId, VmSize};
use crate::provisioning::ProvisioningErrorCode;

/// Vm Domain Events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VmEvent {
    /// Provisioning began for an approved request
    ProvisioningStarted(VmProvisioningStarted),

    /// Hypervisor delivered the machine
    Provisioned(VmProvisioned),

    /// Provisioning failed after exhausting retries
    ProvisioningFailed(VmProvisioningFailed),
}

/// Provisioning began for an approved request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmProvisioningStarted {
    /// Event version for schema evolution
    pub event_version: u32,

    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Vm aggregate ID
    pub aggregate_id: VmId,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for request tracing
    pub correlation_id: Uuid,

    /// Causation ID (event that caused this event)
    pub causation_id: Option<Uuid>,

    /// Originating request
    pub request_id: VmRequestId,

    /// Machine name handed to the hypervisor
    pub vm_name: VmName,

    /// Requested size
    pub size: VmSize,
}

/// Hypervisor delivered the machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmProvisioned {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Hypervisor-side machine reference (operator diagnostics only)
    pub machine_ref: String,

    /// Number of port attempts it took
    pub attempts: u32,
}

/// Provisioning failed after exhausting retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmProvisioningFailed {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Stable diagnostic code of the final failure
    pub error_code: ProvisioningErrorCode,

    /// User-safe failure message
    pub user_message: String,

    /// Number of port attempts made before giving up
    pub attempts: u32,
}

/// Vm provisioning status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmStatus {
    /// No events yet
    Unborn,

    /// Provisioning in flight
    Provisioning,

    /// Machine delivered (terminal)
    Provisioned,

    /// Provisioning failed (terminal)
    Failed,
}

/// Event version constants
impl VmProvisioningStarted {
    pub const CURRENT_VERSION: u32 = 1;
}

impl VmProvisioned {
    pub const CURRENT_VERSION: u32 = 1;
}

impl VmProvisioningFailed {
    pub const CURRENT_VERSION: u32 = 1;
}

impl VmEvent {
    /// Extract aggregate ID from any event variant
    pub fn aggregate_id(&self) -> VmId {
        match self {
            VmEvent::ProvisioningStarted(e) => e.aggregate_id,
            VmEvent::Provisioned(e) => e.aggregate_id,
            VmEvent::ProvisioningFailed(e) => e.aggregate_id,
        }
    }

    /// Extract timestamp from any event variant
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            VmEvent::ProvisioningStarted(e) => e.timestamp,
            VmEvent::Provisioned(e) => e.timestamp,
            VmEvent::ProvisioningFailed(e) => e.timestamp,
        }
    }

    /// Extract event ID from any event variant
    pub fn event_id(&self) -> Uuid {
        match self {
            VmEvent::ProvisioningStarted(e) => e.event_id,
            VmEvent::Provisioned(e) => e.event_id,
            VmEvent::ProvisioningFailed(e) => e.event_id,
        }
    }

    /// Extract correlation ID from any event variant
    pub fn correlation_id(&self) -> Uuid {
        match self {
            VmEvent::ProvisioningStarted(e) => e.correlation_id,
            VmEvent::Provisioned(e) => e.correlation_id,
            VmEvent::ProvisioningFailed(e) => e.correlation_id,
        }
    }

    /// Extract causation ID from any event variant
    pub fn causation_id(&self) -> Option<Uuid> {
        match self {
            VmEvent::ProvisioningStarted(e) => e.causation_id,
            VmEvent::Provisioned(e) => e.causation_id,
            VmEvent::ProvisioningFailed(e) => e.causation_id,
        }
    }

    /// Extract event schema version from any event variant
    pub fn event_version(&self) -> u32 {
        match self {
            VmEvent::ProvisioningStarted(e) => e.event_version,
            VmEvent::Provisioned(e) => e.event_version,
            VmEvent::ProvisioningFailed(e) => e.event_version,
        }
    }

    /// Get human-readable event type name
    pub fn event_type_name(&self) -> &str {
        match self {
            VmEvent::ProvisioningStarted(_) => "VmProvisioningStarted",
            VmEvent::Provisioned(_) => "VmProvisioned",
            VmEvent::ProvisioningFailed(_) => "VmProvisioningFailed",
        }
    }
}
