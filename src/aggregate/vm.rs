// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Vm Aggregate
//!
//! Tracks the hypervisor-side provisioning sub-lifecycle. Kept as its own
//! aggregate so provisioning attempts never contend with approval-side
//! writes on the request stream.

use chrono::{DateTime, Utc};

use crate::domain::{VmId, VmName, VmRequestId, VmSize};
use crate::events::vm::{VmEvent, VmStatus};
use crate::provisioning::ProvisioningErrorCode;

/// Immutable Vm State
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmState {
    /// Aggregate ID
    pub id: VmId,

    /// Originating request
    pub request_id: Option<VmRequestId>,

    /// Machine name handed to the hypervisor
    pub vm_name: Option<VmName>,

    /// Requested size
    pub size: Option<VmSize>,

    /// Current provisioning status
    pub status: VmStatus,

    /// Hypervisor-side machine reference, once provisioned
    pub machine_ref: Option<String>,

    /// Attempts the final outcome took
    pub attempts: Option<u32>,

    /// Diagnostic code of a failure
    pub failure_code: Option<ProvisioningErrorCode>,

    /// Stream version (event count)
    pub version: u64,

    /// First event timestamp
    pub created_at: Option<DateTime<Utc>>,

    /// Latest event timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl VmState {
    /// Create default empty state, used as the fold seed
    pub fn default_for(id: VmId) -> Self {
        Self {
            id,
            request_id: None,
            vm_name: None,
            size: None,
            status: VmStatus::Unborn,
            machine_ref: None,
            attempts: None,
            failure_code: None,
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Reconstruct state from event stream
    pub fn from_events(id: VmId, events: &[VmEvent]) -> Self {
        let initial = Self::default_for(id);
        events.iter().fold(initial, apply_event)
    }

    /// Check if aggregate is initialized (has events)
    pub fn is_initialized(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Apply event to state (pure function)
pub fn apply_event(state: VmState, event: &VmEvent) -> VmState {
    let version = state.version + 1;

    match event {
        VmEvent::ProvisioningStarted(e) => VmState {
            id: e.aggregate_id,
            request_id: Some(e.request_id),
            vm_name: Some(e.vm_name.clone()),
            size: Some(e.size),
            status: VmStatus::Provisioning,
            version,
            created_at: Some(e.timestamp),
            updated_at: Some(e.timestamp),
            ..state
        },

        VmEvent::Provisioned(e) => VmState {
            status: VmStatus::Provisioned,
            machine_ref: Some(e.machine_ref.clone()),
            attempts: Some(e.attempts),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        VmEvent::ProvisioningFailed(e) => VmState {
            status: VmStatus::Failed,
            attempts: Some(e.attempts),
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
    use crate::events::vm::{VmProvisioned, VmProvisioningStarted};
    use uuid::Uuid;

    fn started(id: VmId, request_id: VmRequestId) -> VmEvent {
        VmEvent::ProvisioningStarted(VmProvisioningStarted {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            request_id,
            vm_name: VmName::new("vm-fold-test").unwrap(),
            size: VmSize::M,
        })
    }

    #[test]
    fn test_empty_stream_is_unborn() {
        let state = VmState::from_events(VmId::new(), &[]);
        assert_eq!(state.status, VmStatus::Unborn);
        assert_eq!(state.version, 0);
    }

    #[test]
    fn test_provisioned_records_machine_ref_and_attempts() {
        let id = VmId::new();
        let request_id = VmRequestId::new();

        let events = vec![
            started(id, request_id),
            VmEvent::Provisioned(VmProvisioned {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: Utc::now(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                machine_ref: "vm-4921".to_string(),
                attempts: 3,
            }),
        ];

        let state = VmState::from_events(id, &events);
        assert_eq!(state.status, VmStatus::Provisioned);
        assert_eq!(state.machine_ref.as_deref(), Some("vm-4921"));
        assert_eq!(state.attempts, Some(3));
        assert_eq!(state.request_id, Some(request_id));
        assert_eq!(state.version, 2);
    }
}
