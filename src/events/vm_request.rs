// Copyright (c) 2025 - Cowboy AI, Inc.
//! VmRequest Domain Events
//!
//! All state changes to VmRequest aggregates are represented as immutable
//! events. Events follow event sourcing practice:
//! - Immutable (no setters, only getters)
//! - Past tense naming (RequestApproved, not ApproveRequest)
//! - Include correlation_id and causation_id for traceability
//! - Versioned for schema evolution
//! - Serializable for persistence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    ProjectId, Reason, TenantId, UserId, VmId, VmName, VmRequestId, VmSize,
};
use crate::provisioning::ProvisioningErrorCode;

/// VmRequest Domain Events
///
/// Each variant corresponds to exactly one legal transition of the request
/// state machine. The set is closed: replay matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VmRequestEvent {
    /// Request was created and submitted for approval
    Created(RequestCreated),

    /// Admin approved the request
    Approved(RequestApproved),

    /// Policy engine approved the request without human review
    AutoApproved(RequestAutoApproved),

    /// Request was rejected (by an admin or by policy)
    Rejected(RequestRejected),

    /// Requester cancelled the pending request
    Cancelled(RequestCancelled),

    /// Hypervisor provisioning started for the approved request
    ProvisioningStarted(RequestProvisioningStarted),

    /// Provisioning finished; the VM is ready for use
    Ready(RequestReady),

    /// Provisioning failed after exhausting retries
    Failed(RequestFailed),
}

/// Request was created and submitted for approval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCreated {
    /// Event version for schema evolution
    pub event_version: u32,

    /// Unique event identifier (UUID v7 for time ordering)
    pub event_id: Uuid,

    /// Request aggregate ID
    pub aggregate_id: VmRequestId,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// Correlation ID for request tracing
    pub correlation_id: Uuid,

    /// Causation ID (event that caused this event)
    pub causation_id: Option<Uuid>,

    /// Tenant the request belongs to
    pub tenant_id: TenantId,

    /// Project whose quota the request draws on
    pub project_id: ProjectId,

    /// Requested machine name
    pub vm_name: VmName,

    /// Requested size
    pub size: VmSize,

    /// Business justification
    pub justification: Reason,

    /// User who raised the request
    pub requester_id: UserId,

    /// Email for outcome notifications
    pub requester_email: String,
}

/// Admin approved the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestApproved {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Admin who approved; must differ from the requester
    pub approver_id: UserId,
}

/// Policy engine approved the request without human review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAutoApproved {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Name of the policy rule that matched
    pub rule: String,
}

/// Request was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRejected {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Admin who rejected; None when policy rejected (e.g. quota exceeded)
    pub rejected_by: Option<UserId>,

    /// Why the request was rejected
    pub reason: Reason,
}

/// Requester cancelled the pending request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCancelled {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// User who cancelled (always the original requester)
    pub cancelled_by: UserId,
}

/// Hypervisor provisioning started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestProvisioningStarted {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Vm aggregate tracking the provisioning sub-lifecycle
    pub vm_id: VmId,
}

/// Provisioning finished; the VM is ready
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReady {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Vm aggregate that finished provisioning
    pub vm_id: VmId,
}

/// Provisioning failed after exhausting retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFailed {
    pub event_version: u32,
    pub event_id: Uuid,
    pub aggregate_id: VmRequestId,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,

    /// Stable diagnostic code of the final failure
    pub error_code: ProvisioningErrorCode,

    /// User-safe failure message (no internal identifiers)
    pub user_message: String,
}

/// Request lifecycle status
///
/// `Draft` is the pre-first-event state: an aggregate with no events folds
/// to `Draft`, and `Created` moves it to `PendingApproval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// No events yet; the request does not exist on the write path
    Draft,

    /// Awaiting an approval decision
    PendingApproval,

    /// Approved, provisioning not yet started
    Approved,

    /// Rejected by admin or policy (terminal)
    Rejected,

    /// Cancelled by the requester (terminal)
    Cancelled,

    /// Hypervisor provisioning in flight
    ProvisioningStarted,

    /// VM delivered (terminal)
    Ready,

    /// Provisioning failed (terminal for the write path; retried externally)
    Failed,
}

impl RequestStatus {
    /// Check if a transition to another status is legal
    pub fn can_transition_to(&self, target: &RequestStatus) -> bool {
        use RequestStatus::*;

        match (self, target) {
            (Draft, PendingApproval) => true,

            (PendingApproval, Approved) => true,
            (PendingApproval, Rejected) => true,
            (PendingApproval, Cancelled) => true,

            (Approved, ProvisioningStarted) => true,

            (ProvisioningStarted, Ready) => true,
            (ProvisioningStarted, Failed) => true,

            // Terminal states have no outgoing transitions
            _ => false,
        }
    }

    /// Terminal states accept no further commands on the write path
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected
                | RequestStatus::Cancelled
                | RequestStatus::Ready
                | RequestStatus::Failed
        )
    }
}

/// Event version constants
impl RequestCreated {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestApproved {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestAutoApproved {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestRejected {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestCancelled {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestProvisioningStarted {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestReady {
    pub const CURRENT_VERSION: u32 = 1;
}

impl RequestFailed {
    pub const CURRENT_VERSION: u32 = 1;
}

impl VmRequestEvent {
    /// Extract aggregate ID from any event variant
    pub fn aggregate_id(&self) -> VmRequestId {
        use VmRequestEvent::*;

        match self {
            Created(e) => e.aggregate_id,
            Approved(e) => e.aggregate_id,
            AutoApproved(e) => e.aggregate_id,
            Rejected(e) => e.aggregate_id,
            Cancelled(e) => e.aggregate_id,
            ProvisioningStarted(e) => e.aggregate_id,
            Ready(e) => e.aggregate_id,
            Failed(e) => e.aggregate_id,
        }
    }

    /// Extract timestamp from any event variant
    pub fn timestamp(&self) -> DateTime<Utc> {
        use VmRequestEvent::*;

        match self {
            Created(e) => e.timestamp,
            Approved(e) => e.timestamp,
            AutoApproved(e) => e.timestamp,
            Rejected(e) => e.timestamp,
            Cancelled(e) => e.timestamp,
            ProvisioningStarted(e) => e.timestamp,
            Ready(e) => e.timestamp,
            Failed(e) => e.timestamp,
        }
    }

    /// Extract event ID from any event variant
    pub fn event_id(&self) -> Uuid {
        use VmRequestEvent::*;

        match self {
            Created(e) => e.event_id,
            Approved(e) => e.event_id,
            AutoApproved(e) => e.event_id,
            Rejected(e) => e.event_id,
            Cancelled(e) => e.event_id,
            ProvisioningStarted(e) => e.event_id,
            Ready(e) => e.event_id,
            Failed(e) => e.event_id,
        }
    }

    /// Extract correlation ID from any event variant
    pub fn correlation_id(&self) -> Uuid {
        use VmRequestEvent::*;

        match self {
            Created(e) => e.correlation_id,
            Approved(e) => e.correlation_id,
            AutoApproved(e) => e.correlation_id,
            Rejected(e) => e.correlation_id,
            Cancelled(e) => e.correlation_id,
            ProvisioningStarted(e) => e.correlation_id,
            Ready(e) => e.correlation_id,
            Failed(e) => e.correlation_id,
        }
    }

    /// Extract causation ID from any event variant
    pub fn causation_id(&self) -> Option<Uuid> {
        use VmRequestEvent::*;

        match self {
            Created(e) => e.causation_id,
            Approved(e) => e.causation_id,
            AutoApproved(e) => e.causation_id,
            Rejected(e) => e.causation_id,
            Cancelled(e) => e.causation_id,
            ProvisioningStarted(e) => e.causation_id,
            Ready(e) => e.causation_id,
            Failed(e) => e.causation_id,
        }
    }

    /// Extract event schema version from any event variant
    pub fn event_version(&self) -> u32 {
        use VmRequestEvent::*;

        match self {
            Created(e) => e.event_version,
            Approved(e) => e.event_version,
            AutoApproved(e) => e.event_version,
            Rejected(e) => e.event_version,
            Cancelled(e) => e.event_version,
            ProvisioningStarted(e) => e.event_version,
            Ready(e) => e.event_version,
            Failed(e) => e.event_version,
        }
    }

    /// Get human-readable event type name
    pub fn event_type_name(&self) -> &str {
        use VmRequestEvent::*;

        match self {
            Created(_) => "RequestCreated",
            Approved(_) => "RequestApproved",
            AutoApproved(_) => "RequestAutoApproved",
            Rejected(_) => "RequestRejected",
            Cancelled(_) => "RequestCancelled",
            ProvisioningStarted(_) => "RequestProvisioningStarted",
            Ready(_) => "RequestReady",
            Failed(_) => "RequestFailed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Reason, VmName};

    #[test]
    fn test_status_transitions() {
        use RequestStatus::*;

        // The happy path
        assert!(Draft.can_transition_to(&PendingApproval));
        assert!(PendingApproval.can_transition_to(&Approved));
        assert!(Approved.can_transition_to(&ProvisioningStarted));
        assert!(ProvisioningStarted.can_transition_to(&Ready));

        // Decision branches
        assert!(PendingApproval.can_transition_to(&Rejected));
        assert!(PendingApproval.can_transition_to(&Cancelled));
        assert!(ProvisioningStarted.can_transition_to(&Failed));

        // Illegal shortcuts
        assert!(!Draft.can_transition_to(&Approved));
        assert!(!PendingApproval.can_transition_to(&ProvisioningStarted));
        assert!(!Approved.can_transition_to(&Ready));
        assert!(!Approved.can_transition_to(&Cancelled));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        use RequestStatus::*;

        let all = [
            Draft,
            PendingApproval,
            Approved,
            Rejected,
            Cancelled,
            ProvisioningStarted,
            Ready,
            Failed,
        ];

        for terminal in [Rejected, Cancelled, Ready, Failed] {
            assert!(terminal.is_terminal());
            for target in &all {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = VmRequestEvent::Created(RequestCreated {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: VmRequestId::new(),
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            tenant_id: TenantId::new(),
            project_id: ProjectId::new(),
            vm_name: VmName::new("ci-agent-01").unwrap(),
            size: VmSize::S,
            justification: Reason::new("CI build agents for team X").unwrap(),
            requester_id: UserId::new(),
            requester_email: "dev@example.com".to_string(),
        });

        let json = serde_json::to_string(&event).expect("Failed to serialize");
        assert!(json.contains("\"type\":\"created\""));
        assert!(json.contains("ci-agent-01"));

        let back: VmRequestEvent = serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_accessors() {
        let aggregate_id = VmRequestId::new();
        let correlation_id = Uuid::now_v7();
        let event = VmRequestEvent::Approved(RequestApproved {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id,
            timestamp: Utc::now(),
            correlation_id,
            causation_id: None,
            approver_id: UserId::new(),
        });

        assert_eq!(event.aggregate_id(), aggregate_id);
        assert_eq!(event.correlation_id(), correlation_id);
        assert_eq!(event.event_version(), 1);
        assert_eq!(event.event_type_name(), "RequestApproved");
    }
}
