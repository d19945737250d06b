// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional VmRequest Aggregate
//!
//! Implements event sourcing pattern with pure functions:
//! - Immutable state
//! - Pure event application (fold)
//! - Command handlers as pure functions
//! - No side effects, no mutations
//!
//! # Architecture
//!
//! ```text
//! Command → handle_command() → Result<Event, Error>
//!                                    ↓
//! Events → apply_event() → New State
//! ```

use chrono::{DateTime, Utc};

use crate::domain::{ProjectId, Reason, TenantId, UserId, VmId, VmName, VmRequestId, VmSize};
use crate::events::vm_request::{RequestStatus, VmRequestEvent};
use crate::provisioning::ProvisioningErrorCode;

/// Immutable VmRequest State
///
/// This is the aggregate root state reconstructed from events.
/// All fields are public for read access, but the struct is immutable.
///
/// # Reconstruction
///
/// ```rust,ignore
/// let state = VmRequestState::from_events(&events);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRequestState {
    /// Aggregate ID
    pub id: VmRequestId,

    /// Tenant the request belongs to
    pub tenant_id: Option<TenantId>,

    /// Project whose quota the request draws on
    pub project_id: Option<ProjectId>,

    /// Requested machine name
    pub vm_name: Option<VmName>,

    /// Requested size
    pub size: Option<VmSize>,

    /// Business justification
    pub justification: Option<Reason>,

    /// User who raised the request
    pub requester_id: Option<UserId>,

    /// Email for outcome notifications
    pub requester_email: Option<String>,

    /// Current lifecycle status
    pub status: RequestStatus,

    /// Admin who approved or rejected, when a human decided
    pub decided_by: Option<UserId>,

    /// Policy rule that auto-approved, when policy decided
    pub auto_approved_rule: Option<String>,

    /// Why the request was rejected
    pub rejection_reason: Option<Reason>,

    /// Vm aggregate tracking provisioning, once started
    pub vm_id: Option<VmId>,

    /// Diagnostic code of a provisioning failure
    pub failure_code: Option<ProvisioningErrorCode>,

    /// Stream version (event count); the optimistic concurrency token
    pub version: u64,

    /// When this aggregate was created (first event timestamp)
    pub created_at: Option<DateTime<Utc>>,

    /// When this aggregate was last modified (latest event timestamp)
    pub updated_at: Option<DateTime<Utc>>,
}

impl VmRequestState {
    /// Create default empty state
    ///
    /// Used as initial state for event folding. Status is `Draft`: the
    /// request does not exist until its `Created` event.
    pub fn default_for(id: VmRequestId) -> Self {
        Self {
            id,
            tenant_id: None,
            project_id: None,
            vm_name: None,
            size: None,
            justification: None,
            requester_id: None,
            requester_email: None,
            status: RequestStatus::Draft,
            decided_by: None,
            auto_approved_rule: None,
            rejection_reason: None,
            vm_id: None,
            failure_code: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Reconstruct state from event stream
    ///
    /// This is the core event sourcing fold operation:
    /// ```text
    /// State = fold(Events, InitialState, apply_event)
    /// ```
    pub fn from_events(id: VmRequestId, events: &[VmRequestEvent]) -> Self {
        let initial = Self::default_for(id);
        events.iter().fold(initial, apply_event)
    }

    /// Check if aggregate is initialized (has events)
    pub fn is_initialized(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Apply event to state (pure function)
///
/// This is the core of event sourcing - reconstructing state by applying events.
///
/// # Invariants
/// - Function is pure (no side effects)
/// - Same event + same state = same result
/// - Never fails (events are facts that happened)
/// - `version` advances by exactly one per event
pub fn apply_event(state: VmRequestState, event: &VmRequestEvent) -> VmRequestState {
    use VmRequestEvent::*;

    let version = state.version + 1;

    match event {
        Created(e) => VmRequestState {
            id: e.aggregate_id,
            tenant_id: Some(e.tenant_id),
            project_id: Some(e.project_id),
            vm_name: Some(e.vm_name.clone()),
            size: Some(e.size),
            justification: Some(e.justification.clone()),
            requester_id: Some(e.requester_id),
            requester_email: Some(e.requester_email.clone()),
            status: RequestStatus::PendingApproval,
            version,
            created_at: Some(e.timestamp),
            updated_at: Some(e.timestamp),
            ..state
        },

        Approved(e) => VmRequestState {
            status: RequestStatus::Approved,
            decided_by: Some(e.approver_id),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        AutoApproved(e) => VmRequestState {
            status: RequestStatus::Approved,
            auto_approved_rule: Some(e.rule.clone()),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        Rejected(e) => VmRequestState {
            status: RequestStatus::Rejected,
            decided_by: e.rejected_by,
            rejection_reason: Some(e.reason.clone()),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        Cancelled(e) => VmRequestState {
            status: RequestStatus::Cancelled,
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        ProvisioningStarted(e) => VmRequestState {
            status: RequestStatus::ProvisioningStarted,
            vm_id: Some(e.vm_id),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        Ready(e) => VmRequestState {
            status: RequestStatus::Ready,
            vm_id: Some(e.vm_id),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        Failed(e) => VmRequestState {
            status: RequestStatus::Failed,
            failure_code: Some(e.error_code),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::vm_request::{
        RequestAutoApproved, RequestCreated, RequestProvisioningStarted, RequestReady,
    };
    use uuid::Uuid;

    fn created_event(id: VmRequestId) -> VmRequestEvent {
        VmRequestEvent::Created(RequestCreated {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            tenant_id: TenantId::new(),
            project_id: ProjectId::new(),
            vm_name: VmName::new("fold-test").unwrap(),
            size: VmSize::S,
            justification: Reason::new("state reconstruction test").unwrap(),
            requester_id: UserId::new(),
            requester_email: "dev@example.com".to_string(),
        })
    }

    #[test]
    fn test_empty_stream_folds_to_draft() {
        let id = VmRequestId::new();
        let state = VmRequestState::from_events(id, &[]);

        assert_eq!(state.status, RequestStatus::Draft);
        assert_eq!(state.version, 0);
        assert!(!state.is_initialized());
    }

    #[test]
    fn test_created_initializes_state() {
        let id = VmRequestId::new();
        let state = VmRequestState::from_events(id, &[created_event(id)]);

        assert_eq!(state.status, RequestStatus::PendingApproval);
        assert_eq!(state.version, 1);
        assert!(state.is_initialized());
        assert_eq!(state.size, Some(VmSize::S));
    }

    #[test]
    fn test_auto_approve_flow_folds_to_ready() {
        let id = VmRequestId::new();
        let vm_id = VmId::new();
        let correlation_id = Uuid::now_v7();

        let events = vec![
            created_event(id),
            VmRequestEvent::AutoApproved(RequestAutoApproved {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: Utc::now(),
                correlation_id,
                causation_id: None,
                rule: "auto-approve-small-dev".to_string(),
            }),
            VmRequestEvent::ProvisioningStarted(RequestProvisioningStarted {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: Utc::now(),
                correlation_id,
                causation_id: None,
                vm_id,
            }),
            VmRequestEvent::Ready(RequestReady {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: Utc::now(),
                correlation_id,
                causation_id: None,
                vm_id,
            }),
        ];

        let state = VmRequestState::from_events(id, &events);

        assert_eq!(state.status, RequestStatus::Ready);
        assert_eq!(state.version, 4);
        assert_eq!(state.vm_id, Some(vm_id));
        assert_eq!(
            state.auto_approved_rule.as_deref(),
            Some("auto-approve-small-dev")
        );
    }

    #[test]
    fn test_fold_is_deterministic() {
        let id = VmRequestId::new();
        let events = vec![created_event(id)];

        let a = VmRequestState::from_events(id, &events);
        let b = VmRequestState::from_events(id, &events);
        assert_eq!(a, b);
    }
}
