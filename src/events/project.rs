// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project Domain Events
//!
//! The Project aggregate is the quota-holding boundary. Reservations are
//! facts in the project's own stream, so current usage can always be folded
//! from the stream itself; the quota gate never consults the read model,
//! which may lag behind by the projection-propagation delay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    ProjectId, ProjectType, QuotaLimits, ResourceFootprint, TenantId, VmRequestId,
};

/// Project Domain Events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProjectEvent {
    /// Project was registered with its type and quota limits
    Registered(ProjectRegistered),

    /// Quota was reserved for an approved request
    QuotaReserved(QuotaReserved),

    /// Quota was released (request rejected after reservation, VM retired)
    QuotaReleased(QuotaReleased),
}

/// Project was registered with its type and quota limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRegistered {
    /// Event version for schema evolution
    pub event_version: u32,

    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Project aggregate ID
    pub aggregate_id: ProjectId,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for request tracing
    pub correlation_id: Uuid,

    /// Causation ID (event that caused this event)
    pub causation_id: Option<Uuid>,

    /// Tenant the project belongs to
    pub tenant_id: TenantId,

    /// Project classification, used by policy rules
    pub project_type: ProjectType,

    /// Numeric quota ceiling
    pub limits: QuotaLimits,
}

/// Quota was reserved for an approved request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaReserved {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: ProjectId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Request the reservation belongs to
    pub request_id: VmRequestId,

    /// Reserved footprint
    pub footprint: ResourceFootprint,
}

/// Quota was released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaReleased {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: ProjectId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Request whose reservation is released
    pub request_id: VmRequestId,

    /// Released footprint
    pub footprint: ResourceFootprint,
}

/// Event version constants
impl ProjectRegistered {
    pub const CURRENT_VERSION: u32 = 1;
}

impl QuotaReserved {
    pub const CURRENT_VERSION: u32 = 1;
}

impl QuotaReleased {
    pub const CURRENT_VERSION: u32 = 1;
}

impl ProjectEvent {
    /// Extract aggregate ID from any event variant
    pub fn aggregate_id(&self) -> ProjectId {
        match self {
            ProjectEvent::Registered(e) => e.aggregate_id,
            ProjectEvent::QuotaReserved(e) => e.aggregate_id,
            ProjectEvent::QuotaReleased(e) => e.aggregate_id,
        }
    }

    /// Extract timestamp from any event variant
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ProjectEvent::Registered(e) => e.timestamp,
            ProjectEvent::QuotaReserved(e) => e.timestamp,
            ProjectEvent::QuotaReleased(e) => e.timestamp,
        }
    }

    /// Extract event ID from any event variant
    pub fn event_id(&self) -> Uuid {
        match self {
            ProjectEvent::Registered(e) => e.event_id,
            ProjectEvent::QuotaReserved(e) => e.event_id,
            ProjectEvent::QuotaReleased(e) => e.event_id,
        }
    }

    /// Extract correlation ID from any event variant
    pub fn correlation_id(&self) -> Uuid {
        match self {
            ProjectEvent::Registered(e) => e.correlation_id,
            ProjectEvent::QuotaReserved(e) => e.correlation_id,
            ProjectEvent::QuotaReleased(e) => e.correlation_id,
        }
    }

    /// Extract causation ID from any event variant
    pub fn causation_id(&self) -> Option<Uuid> {
        match self {
            ProjectEvent::Registered(e) => e.causation_id,
            ProjectEvent::QuotaReserved(e) => e.causation_id,
            ProjectEvent::QuotaReleased(e) => e.causation_id,
        }
    }

    /// Extract event schema version from any event variant
    pub fn event_version(&self) -> u32 {
        match self {
            ProjectEvent::Registered(e) => e.event_version,
            ProjectEvent::QuotaReserved(e) => e.event_version,
            ProjectEvent::QuotaReleased(e) => e.event_version,
        }
    }

    /// Get human-readable event type name
    pub fn event_type_name(&self) -> &str {
        match self {
            ProjectEvent::Registered(_) => "ProjectRegistered",
            ProjectEvent::QuotaReserved(_) => "QuotaReserved",
            ProjectEvent::QuotaReleased(_) => "QuotaReleased",
        }
    }
}
