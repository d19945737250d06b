// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Commands for the Platform Aggregates
//!
//! Commands express user intent and can fail validation.
//! They contain all data needed for business rule enforcement.
//!
//! # Command Pattern
//!
//! ```text
//! Command → handle_command(State, Command) → Result<Event, Error>
//! ```
//!
//! Commands differ from Events:
//! - Commands express intent (what should happen)
//! - Events express facts (what did happen)
//! - Commands can be rejected by business rules
//! - Events cannot fail (they already happened)
//!
//! # Time Handling
//!
//! All commands include explicit `timestamp` parameter.
//! **NEVER call `Utc::now()` in domain logic**.
//! Time is passed from the application layer.
//!
//! # Free-Text Validation
//!
//! Name fields arrive pre-validated as [`VmName`]; free-text reasons and
//! justifications arrive as raw `String` and are validated by the handlers,
//! so a bad justification surfaces as a command error rather than a
//! transport-layer failure.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{ProjectId, ProjectType, QuotaLimits, ResourceFootprint, TenantId, UserId,
    VmId, VmName, VmRequestId, VmSize};
use crate::provisioning::ProvisioningErrorCode;

/// Command to create a VM request
///
/// This is the initial command that creates the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateVmRequestCommand {
    /// Tenant the request belongs to
    pub tenant_id: TenantId,

    /// Project whose quota the request draws on
    pub project_id: ProjectId,

    /// Requested machine name
    pub vm_name: VmName,

    /// Requested size
    pub size: VmSize,

    /// Business justification (validated by the handler)
    pub justification: String,

    /// User raising the request
    pub requester_id: UserId,

    /// Email for outcome notifications
    pub requester_email: String,

    /// Timestamp when command was issued (explicit time parameter)
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,
}

/// Command to approve a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveRequestCommand {
    /// Admin approving the request
    pub approver_id: UserId,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID (event that caused this command)
    pub causation_id: Option<Uuid>,
}

/// Command to auto-approve a pending request by policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoApproveRequestCommand {
    /// Name of the policy rule that matched
    pub rule: String,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to reject a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectRequestCommand {
    /// Admin rejecting; None when policy rejected
    pub rejected_by: Option<UserId>,

    /// Why the request is rejected (validated by the handler)
    pub reason: String,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to cancel a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequestCommand {
    /// User cancelling; must be the original requester
    pub cancelled_by: UserId,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to record that provisioning has started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartProvisioningCommand {
    /// Vm aggregate that will track the provisioning sub-lifecycle
    pub vm_id: VmId,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to open a Vm aggregate stream for an approved request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginVmProvisioningCommand {
    /// Originating request
    pub request_id: VmRequestId,

    /// Machine name handed to the hypervisor
    pub vm_name: VmName,

    /// Requested size
    pub size: VmSize,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to record a successful provisioning outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkReadyCommand {
    /// Vm aggregate that finished provisioning
    pub vm_id: VmId,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to record a failed provisioning outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkFailedCommand {
    /// Stable diagnostic code of the final failure
    pub error_code: ProvisioningErrorCode,

    /// User-safe failure message
    pub user_message: String,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to record a successful hypervisor delivery on the Vm stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteVmProvisioningCommand {
    /// Hypervisor-side machine reference
    pub machine_ref: String,

    /// Attempts the delivery took
    pub attempts: u32,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to record an exhausted provisioning attempt on the Vm stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailVmProvisioningCommand {
    /// Stable diagnostic code of the final failure
    pub error_code: ProvisioningErrorCode,

    /// User-safe failure message
    pub user_message: String,

    /// Attempts made before giving up
    pub attempts: u32,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to register a project with its quota limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterProjectCommand {
    /// Tenant the project belongs to
    pub tenant_id: TenantId,

    /// Project classification
    pub project_type: ProjectType,

    /// Quota ceiling
    pub limits: QuotaLimits,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,
}

/// Command to reserve quota for an approved request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveQuotaCommand {
    /// Request the reservation belongs to
    pub request_id: VmRequestId,

    /// Footprint to reserve
    pub footprint: ResourceFootprint,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}

/// Command to release a quota reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseQuotaCommand {
    /// Request whose reservation is released
    pub request_id: VmRequestId,

    /// Footprint to release
    pub footprint: ResourceFootprint,

    /// Timestamp when command was issued
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for distributed tracing
    pub correlation_id: Uuid,

    /// Optional causation ID
    pub causation_id: Option<Uuid>,
}
