// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Command Handlers for the Platform Aggregates
//!
//! Command handlers are pure functions that:
//! 1. Take current state + command
//! 2. Validate business rules
//! 3. Return Event (success) or Error (validation failure)
//!
//! # Handler Pattern
//!
//! ```text
//! handle_command(State, Command) → Result<Event, CommandError>
//! ```
//!
//! All handlers are **pure functions**:
//! - No side effects (no I/O, no Utc::now(), no mutations)
//! - Deterministic modulo fresh event IDs
//! - State transitions validated against the request status machine
//!
//! # Business Rule Enforcement
//!
//! - Requests can't be double-created
//! - Decisions only apply to pending requests; terminal states are final
//! - Requesters can't approve or reject their own requests
//! - Only the requester can cancel
//! - Free-text reasons are validated here, not at construction

use uuid::Uuid;

use crate::aggregate::commands::*;
use crate::aggregate::project::ProjectState;
use crate::aggregate::vm::VmState;
use crate::aggregate::vm_request::VmRequestState;
use crate::domain::{Reason, ReasonError, VmRequestId};
use crate::events::project::*;
use crate::events::vm::*;
use crate::events::vm_request::*;

/// Command validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Aggregate is not initialized (no events yet)
    #[error("Request not initialized")]
    NotInitialized,

    /// Aggregate is already initialized (can't create twice)
    #[error("Request already initialized")]
    AlreadyInitialized,

    /// Command is not legal in the current status
    #[error("Command not allowed in status {current:?}")]
    InvalidState { current: RequestStatus },

    /// Command is not legal in the Vm's current status
    #[error("Command not allowed in VM status {current:?}")]
    InvalidVmState { current: VmStatus },

    /// Actor is not allowed to perform this action
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Free-text reason failed validation
    #[error("Invalid reason: {0}")]
    InvalidReason(#[from] ReasonError),

    /// Reservation would overflow the project quota
    #[error("Project quota exceeded")]
    QuotaExceeded,
}

/// Handle CreateVmRequest command
///
/// # Business Rules
/// - Request must not already be initialized
/// - Justification must pass [`Reason`] validation
pub fn handle_create_request(
    state: &VmRequestState,
    command: CreateVmRequestCommand,
    aggregate_id: VmRequestId,
) -> Result<RequestCreated, CommandError> {
    if state.is_initialized() {
        return Err(CommandError::AlreadyInitialized);
    }

    let justification = Reason::new(command.justification)?;

    Ok(RequestCreated {
        event_version: RequestCreated::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: None,
        tenant_id: command.tenant_id,
        project_id: command.project_id,
        vm_name: command.vm_name,
        size: command.size,
        justification,
        requester_id: command.requester_id,
        requester_email: command.requester_email,
    })
}

/// Handle ApproveRequest command
///
/// # Business Rules
/// - Request must be pending
/// - Approver must not be the requester
pub fn handle_approve_request(
    state: &VmRequestState,
    command: ApproveRequestCommand,
) -> Result<RequestApproved, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != RequestStatus::PendingApproval {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }
    if state.requester_id == Some(command.approver_id) {
        return Err(CommandError::Forbidden(
            "requesters cannot approve their own requests",
        ));
    }

    Ok(RequestApproved {
        event_version: RequestApproved::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        approver_id: command.approver_id,
    })
}

/// Handle AutoApproveRequest command
///
/// # Business Rules
/// - Request must be pending
pub fn handle_auto_approve_request(
    state: &VmRequestState,
    command: AutoApproveRequestCommand,
) -> Result<RequestAutoApproved, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != RequestStatus::PendingApproval {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }

    Ok(RequestAutoApproved {
        event_version: RequestAutoApproved::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        rule: command.rule,
    })
}

/// Handle RejectRequest command
///
/// # Business Rules
/// - Request must be pending
/// - A human rejecter must not be the requester
/// - Reason must pass [`Reason`] validation
pub fn handle_reject_request(
    state: &VmRequestState,
    command: RejectRequestCommand,
) -> Result<RequestRejected, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != RequestStatus::PendingApproval {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }
    if command.rejected_by.is_some() && command.rejected_by == state.requester_id {
        return Err(CommandError::Forbidden(
            "requesters cannot reject their own requests",
        ));
    }

    let reason = Reason::new(command.reason)?;

    Ok(RequestRejected {
        event_version: RequestRejected::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        rejected_by: command.rejected_by,
        reason,
    })
}

/// Handle CancelRequest command
///
/// # Business Rules
/// - Request must be pending
/// - Only the original requester can cancel
pub fn handle_cancel_request(
    state: &VmRequestState,
    command: CancelRequestCommand,
) -> Result<RequestCancelled, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != RequestStatus::PendingApproval {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }
    if state.requester_id != Some(command.cancelled_by) {
        return Err(CommandError::Forbidden(
            "only the requester can cancel a request",
        ));
    }

    Ok(RequestCancelled {
        event_version: RequestCancelled::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        cancelled_by: command.cancelled_by,
    })
}

/// Handle StartProvisioning command
///
/// # Business Rules
/// - Request must be approved
pub fn handle_start_provisioning(
    state: &VmRequestState,
    command: StartProvisioningCommand,
) -> Result<RequestProvisioningStarted, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != RequestStatus::Approved {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }

    Ok(RequestProvisioningStarted {
        event_version: RequestProvisioningStarted::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        vm_id: command.vm_id,
    })
}

/// Handle MarkReady command
///
/// # Business Rules
/// - Provisioning must be in flight
pub fn handle_mark_ready(
    state: &VmRequestState,
    command: MarkReadyCommand,
) -> Result<RequestReady, CommandError> {
    if state.status != RequestStatus::ProvisioningStarted {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }

    Ok(RequestReady {
        event_version: RequestReady::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        vm_id: command.vm_id,
    })
}

/// Handle MarkFailed command
///
/// # Business Rules
/// - Provisioning must be in flight
pub fn handle_mark_failed(
    state: &VmRequestState,
    command: MarkFailedCommand,
) -> Result<RequestFailed, CommandError> {
    if state.status != RequestStatus::ProvisioningStarted {
        return Err(CommandError::InvalidState {
            current: state.status,
        });
    }

    Ok(RequestFailed {
        event_version: RequestFailed::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        error_code: command.error_code,
        user_message: command.user_message,
    })
}

/// Handle the first event of a Vm aggregate
///
/// # Business Rules
/// - Vm must not already be initialized
pub fn handle_begin_vm_provisioning(
    state: &VmState,
    command: BeginVmProvisioningCommand,
) -> Result<VmProvisioningStarted, CommandError> {
    if state.is_initialized() {
        return Err(CommandError::AlreadyInitialized);
    }

    Ok(VmProvisioningStarted {
        event_version: VmProvisioningStarted::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        request_id: command.request_id,
        vm_name: command.vm_name,
        size: command.size,
    })
}

/// Handle CompleteVmProvisioning command
///
/// # Business Rules
/// - Vm must be provisioning
pub fn handle_complete_vm_provisioning(
    state: &VmState,
    command: CompleteVmProvisioningCommand,
) -> Result<VmProvisioned, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != VmStatus::Provisioning {
        return Err(CommandError::InvalidVmState {
            current: state.status,
        });
    }

    Ok(VmProvisioned {
        event_version: VmProvisioned::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        machine_ref: command.machine_ref,
        attempts: command.attempts,
    })
}

/// Handle FailVmProvisioning command
///
/// # Business Rules
/// - Vm must be provisioning
pub fn handle_fail_vm_provisioning(
    state: &VmState,
    command: FailVmProvisioningCommand,
) -> Result<VmProvisioningFailed, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    if state.status != VmStatus::Provisioning {
        return Err(CommandError::InvalidVmState {
            current: state.status,
        });
    }

    Ok(VmProvisioningFailed {
        event_version: VmProvisioningFailed::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        error_code: command.error_code,
        user_message: command.user_message,
        attempts: command.attempts,
    })
}

/// Handle RegisterProject command
///
/// # Business Rules
/// - Project must not already be registered
pub fn handle_register_project(
    state: &ProjectState,
    command: RegisterProjectCommand,
) -> Result<ProjectRegistered, CommandError> {
    if state.is_initialized() {
        return Err(CommandError::AlreadyInitialized);
    }

    Ok(ProjectRegistered {
        event_version: ProjectRegistered::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: None,
        tenant_id: command.tenant_id,
        project_type: command.project_type,
        limits: command.limits,
    })
}

/// Handle ReserveQuota command
///
/// # Business Rules
/// - Project must be registered
/// - The reservation must fit within the project limits; filling the
///   quota exactly is allowed
pub fn handle_reserve_quota(
    state: &ProjectState,
    command: ReserveQuotaCommand,
) -> Result<QuotaReserved, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }
    let limits = state.limits.as_ref().ok_or(CommandError::NotInitialized)?;
    if state.usage.would_exceed(limits, &command.footprint) {
        return Err(CommandError::QuotaExceeded);
    }

    Ok(QuotaReserved {
        event_version: QuotaReserved::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        request_id: command.request_id,
        footprint: command.footprint,
    })
}

/// Handle ReleaseQuota command
///
/// # Business Rules
/// - Project must be registered
pub fn handle_release_quota(
    state: &ProjectState,
    command: ReleaseQuotaCommand,
) -> Result<QuotaReleased, CommandError> {
    if !state.is_initialized() {
        return Err(CommandError::NotInitialized);
    }

    Ok(QuotaReleased {
        event_version: QuotaReleased::CURRENT_VERSION,
        event_id: Uuid::now_v7(),
        aggregate_id: state.id,
        timestamp: command.timestamp,
        correlation_id: command.correlation_id,
        causation_id: command.causation_id,
        request_id: command.request_id,
        footprint: command.footprint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::vm_request::apply_event;
    use crate::domain::{
        ProjectId, ProjectType, QuotaLimits, TenantId, UserId, VmId, VmName, VmSize,
    };
    use chrono::{DateTime, Utc};

    fn test_timestamp() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-19T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn create_command(requester_id: UserId) -> CreateVmRequestCommand {
        CreateVmRequestCommand {
            tenant_id: TenantId::new(),
            project_id: ProjectId::new(),
            vm_name: VmName::new("handler-test").unwrap(),
            size: VmSize::S,
            justification: "Load testing for the payment gateway".to_string(),
            requester_id,
            requester_email: "dev@example.com".to_string(),
            timestamp: test_timestamp(),
            correlation_id: Uuid::now_v7(),
        }
    }

    fn pending_state(requester_id: UserId) -> VmRequestState {
        let id = VmRequestId::new();
        let state = VmRequestState::default_for(id);
        let event = handle_create_request(&state, create_command(requester_id), id).unwrap();
        apply_event(state, &VmRequestEvent::Created(event))
    }

    #[test]
    fn test_create_validates_justification() {
        let id = VmRequestId::new();
        let state = VmRequestState::default_for(id);

        let mut cmd = create_command(UserId::new());
        cmd.justification = "too short".to_string();

        let err = handle_create_request(&state, cmd, id).unwrap_err();
        assert!(matches!(err, CommandError::InvalidReason(_)));
    }

    #[test]
    fn test_create_twice_is_rejected() {
        let requester = UserId::new();
        let state = pending_state(requester);

        let err = handle_create_request(&state, create_command(requester), state.id).unwrap_err();
        assert_eq!(err, CommandError::AlreadyInitialized);
    }

    #[test]
    fn test_self_approval_is_forbidden() {
        let requester = UserId::new();
        let state = pending_state(requester);

        let err = handle_approve_request(
            &state,
            ApproveRequestCommand {
                approver_id: requester,
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();

        assert!(matches!(err, CommandError::Forbidden(_)));
    }

    #[test]
    fn test_self_rejection_is_forbidden() {
        let requester = UserId::new();
        let state = pending_state(requester);

        let err = handle_reject_request(
            &state,
            RejectRequestCommand {
                rejected_by: Some(requester),
                reason: "Trying to reject my own request".to_string(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();

        assert!(matches!(err, CommandError::Forbidden(_)));
    }

    #[test]
    fn test_approve_pending_request() {
        let state = pending_state(UserId::new());
        let approver = UserId::new();

        let event = handle_approve_request(
            &state,
            ApproveRequestCommand {
                approver_id: approver,
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap();

        assert_eq!(event.approver_id, approver);

        let approved = apply_event(state, &VmRequestEvent::Approved(event));
        assert_eq!(approved.status, RequestStatus::Approved);
    }

    #[test]
    fn test_decision_on_decided_request_is_rejected() {
        let state = pending_state(UserId::new());
        let approved = apply_event(
            state.clone(),
            &VmRequestEvent::Approved(
                handle_approve_request(
                    &state,
                    ApproveRequestCommand {
                        approver_id: UserId::new(),
                        timestamp: test_timestamp(),
                        correlation_id: Uuid::now_v7(),
                        causation_id: None,
                    },
                )
                .unwrap(),
            ),
        );

        let err = handle_reject_request(
            &approved,
            RejectRequestCommand {
                rejected_by: Some(UserId::new()),
                reason: "Attempting to reject an approved request".to_string(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            CommandError::InvalidState {
                current: RequestStatus::Approved
            }
        );
    }

    #[test]
    fn test_only_requester_can_cancel() {
        let requester = UserId::new();
        let state = pending_state(requester);

        let err = handle_cancel_request(
            &state,
            CancelRequestCommand {
                cancelled_by: UserId::new(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CommandError::Forbidden(_)));

        let event = handle_cancel_request(
            &state,
            CancelRequestCommand {
                cancelled_by: requester,
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap();
        assert_eq!(event.cancelled_by, requester);
    }

    #[test]
    fn test_policy_rejection_carries_no_actor() {
        let state = pending_state(UserId::new());

        let event = handle_reject_request(
            &state,
            RejectRequestCommand {
                rejected_by: None,
                reason: "project quota exceeded".to_string(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap();

        assert_eq!(event.rejected_by, None);
    }

    #[test]
    fn test_start_provisioning_requires_approved() {
        let state = pending_state(UserId::new());

        let err = handle_start_provisioning(
            &state,
            StartProvisioningCommand {
                vm_id: VmId::new(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            CommandError::InvalidState {
                current: RequestStatus::PendingApproval
            }
        );
    }

    #[test]
    fn test_reserve_quota_enforces_limits() {
        let id = ProjectId::new();
        let state = ProjectState::default_for(id);
        let registered = handle_register_project(
            &state,
            RegisterProjectCommand {
                tenant_id: TenantId::new(),
                project_type: ProjectType::Development,
                limits: QuotaLimits {
                    max_vms: 1,
                    resources: VmSize::S.footprint(),
                },
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
            },
        )
        .unwrap();
        let state = crate::aggregate::project::apply_event(
            state,
            &crate::events::project::ProjectEvent::Registered(registered),
        );

        // Exact fit is allowed
        let reserved = handle_reserve_quota(
            &state,
            ReserveQuotaCommand {
                request_id: VmRequestId::new(),
                footprint: VmSize::S.footprint(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap();
        let state = crate::aggregate::project::apply_event(
            state,
            &crate::events::project::ProjectEvent::QuotaReserved(reserved),
        );

        // A second reservation overflows
        let err = handle_reserve_quota(
            &state,
            ReserveQuotaCommand {
                request_id: VmRequestId::new(),
                footprint: VmSize::S.footprint(),
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();
        assert_eq!(err, CommandError::QuotaExceeded);
    }

    #[test]
    fn test_vm_outcome_requires_provisioning_in_flight() {
        let vm_id = VmId::new();
        let complete = CompleteVmProvisioningCommand {
            machine_ref: "vm-7001".to_string(),
            attempts: 1,
            timestamp: test_timestamp(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
        };

        // No events yet: the Vm does not exist
        let fresh = VmState::default_for(vm_id);
        let err = handle_complete_vm_provisioning(&fresh, complete.clone()).unwrap_err();
        assert_eq!(err, CommandError::NotInitialized);

        // An already-delivered Vm reports its actual status
        let started = handle_begin_vm_provisioning(
            &fresh,
            BeginVmProvisioningCommand {
                request_id: VmRequestId::new(),
                vm_name: VmName::new("handler-test").unwrap(),
                size: VmSize::S,
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap();
        let state =
            crate::aggregate::vm::apply_event(fresh, &VmEvent::ProvisioningStarted(started));
        let provisioned = handle_complete_vm_provisioning(&state, complete.clone()).unwrap();
        let state =
            crate::aggregate::vm::apply_event(state, &VmEvent::Provisioned(provisioned));

        let err = handle_complete_vm_provisioning(&state, complete).unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidVmState {
                current: VmStatus::Provisioned
            }
        );
        let err = handle_fail_vm_provisioning(
            &state,
            FailVmProvisioningCommand {
                error_code: crate::provisioning::ProvisioningErrorCode::Connection,
                user_message: "Provisioning is temporarily unavailable".to_string(),
                attempts: 5,
                timestamp: test_timestamp(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            CommandError::InvalidVmState {
                current: VmStatus::Provisioned
            }
        );
    }
}
