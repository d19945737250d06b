// Copyright (c) 2025 - Cowboy AI, Inc.
//! Request Lifecycle State Machine
//!
//! Formal FSM implementation for the VM request lifecycle.
//! Uses the generic StateMachine trait from parent module.
//!
//! # State Machine Type
//!
//! This is a **Mealy Machine**: outputs depend on both state and input.
//!
//! # States
//!
//! - Draft: pre-creation (no events)
//! - PendingApproval: awaiting a decision
//! - Approved: decision made, provisioning not started
//! - Rejected / Cancelled: terminal decision outcomes
//! - ProvisioningStarted: hypervisor work in flight
//! - Ready / Failed: terminal provisioning outcomes
//!
//! # Inputs (Lifecycle Actions)
//!
//! - Submit: Draft → PendingApproval
//! - Approve / AutoApprove: PendingApproval → Approved
//! - Reject: PendingApproval → Rejected
//! - Cancel: PendingApproval → Cancelled
//! - StartProvisioning: Approved → ProvisioningStarted
//! - CompleteProvisioning: ProvisioningStarted → Ready
//! - FailProvisioning: ProvisioningStarted → Failed

use super::{StateMachine, TransitionError, TransitionResult};
use crate::events::RequestStatus;

/// Lifecycle action (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    /// Submit a new request for approval
    Submit,

    /// Admin approves the pending request
    Approve,

    /// Policy approves the pending request without human review
    AutoApprove,

    /// Reject the pending request
    Reject,

    /// Requester withdraws the pending request
    Cancel,

    /// Begin hypervisor provisioning
    StartProvisioning,

    /// Provisioning delivered the machine
    CompleteProvisioning,

    /// Provisioning gave up
    FailProvisioning,
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutput {
    /// Warnings generated during transition
    pub warnings: Vec<String>,

    /// Whether this transition ends the request's write-path lifecycle
    pub is_terminal: bool,
}

impl TransitionOutput {
    /// Create output with no warnings
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            is_terminal: false,
        }
    }

    /// Create output for a terminal transition
    pub fn terminal(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_terminal: true,
        }
    }
}

impl StateMachine for RequestStatus {
    type Input = RequestAction;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use RequestAction::*;
        use RequestStatus::*;

        match (self, input) {
            (Draft, Submit) => Ok((PendingApproval, TransitionOutput::ok())),

            (PendingApproval, Approve) => Ok((Approved, TransitionOutput::ok())),
            (PendingApproval, AutoApprove) => Ok((Approved, TransitionOutput::ok())),
            (PendingApproval, Reject) => Ok((Rejected, TransitionOutput::terminal(Vec::new()))),
            (PendingApproval, Cancel) => Ok((Cancelled, TransitionOutput::terminal(Vec::new()))),

            (Approved, StartProvisioning) => Ok((ProvisioningStarted, TransitionOutput::ok())),

            (ProvisioningStarted, CompleteProvisioning) => {
                Ok((Ready, TransitionOutput::terminal(Vec::new())))
            }
            (ProvisioningStarted, FailProvisioning) => Ok((
                Failed,
                TransitionOutput::terminal(vec!["Provisioning failed".to_string()]),
            )),

            (from, _) if from.is_terminal() => Err(TransitionError::InvalidTransition {
                from: format!("{from:?}"),
                to: "any state".to_string(),
            }),

            (from, input) => Err(TransitionError::InvalidTransition {
                from: format!("{from:?}"),
                to: format!("via {input:?}"),
            }),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        use RequestAction::*;
        use RequestStatus::*;

        match self {
            Draft => vec![Submit],
            PendingApproval => vec![Approve, AutoApprove, Reject, Cancel],
            Approved => vec![StartProvisioning],
            ProvisioningStarted => vec![CompleteProvisioning, FailProvisioning],
            Rejected | Cancelled | Ready | Failed => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_to_ready() {
        let (pending, _) = RequestStatus::Draft
            .transition(&RequestAction::Submit)
            .unwrap();
        let (approved, _) = pending.transition(&RequestAction::AutoApprove).unwrap();
        let (provisioning, _) = approved
            .transition(&RequestAction::StartProvisioning)
            .unwrap();
        let (ready, output) = provisioning
            .transition(&RequestAction::CompleteProvisioning)
            .unwrap();

        assert_eq!(ready, RequestStatus::Ready);
        assert!(output.is_terminal);
    }

    #[test]
    fn test_rejection_is_terminal() {
        let (rejected, output) = RequestStatus::PendingApproval
            .transition(&RequestAction::Reject)
            .unwrap();

        assert_eq!(rejected, RequestStatus::Rejected);
        assert!(output.is_terminal);
        assert!(rejected.transition(&RequestAction::Approve).is_err());
        assert!(rejected.valid_inputs().is_empty());
    }

    #[test]
    fn test_cannot_skip_approval() {
        let err = RequestStatus::PendingApproval
            .transition(&RequestAction::StartProvisioning)
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn test_cannot_cancel_after_approval() {
        assert!(RequestStatus::Approved
            .transition(&RequestAction::Cancel)
            .is_err());
    }

    #[test]
    fn test_failed_provisioning_warns() {
        let (failed, output) = RequestStatus::ProvisioningStarted
            .transition(&RequestAction::FailProvisioning)
            .unwrap();

        assert_eq!(failed, RequestStatus::Failed);
        assert!(!output.warnings.is_empty());
    }

    #[test]
    fn test_valid_inputs_match_transition_results() {
        use RequestStatus::*;

        for status in [
            Draft,
            PendingApproval,
            Approved,
            Rejected,
            Cancelled,
            ProvisioningStarted,
            Ready,
            Failed,
        ] {
            for input in status.valid_inputs() {
                assert!(
                    status.can_transition(&input),
                    "{status:?} lists {input:?} as valid but transition fails"
                );
            }
        }
    }
}
