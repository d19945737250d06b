// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests
//!
//! This test suite uses proptest to verify properties that must hold for
//! all valid inputs:
//! - Event replay is deterministic
//! - Quota arithmetic is consistent
//! - The docket never approves an over-quota request
//! - Value object boundaries are exact

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use vmdocket::aggregate::vm_request::apply_event;
use vmdocket::aggregate::VmRequestState;
use vmdocket::docket::{Decision, DocketEngine, RequestSnapshot};
use vmdocket::domain::{
    ProjectId, ProjectType, QuotaLimits, QuotaUsage, Reason, ResourceFootprint, TenantId, UserId,
    VmId, VmName, VmRequestId, VmSize,
};
use vmdocket::events::vm_request::{
    RequestApproved, RequestAutoApproved, RequestCancelled, RequestCreated,
    RequestProvisioningStarted, RequestReady, RequestRejected, RequestStatus, VmRequestEvent,
};

// ============================================================================
// Strategies
// ============================================================================

fn vm_size() -> impl Strategy<Value = VmSize> {
    prop_oneof![Just(VmSize::S), Just(VmSize::M), Just(VmSize::L)]
}

fn project_type() -> impl Strategy<Value = ProjectType> {
    prop_oneof![
        Just(ProjectType::Development),
        Just(ProjectType::Production)
    ]
}

fn footprint() -> impl Strategy<Value = ResourceFootprint> {
    (0u32..200, 0u32..400, 0u32..5000).prop_map(|(cpu, ram_gb, disk_gb)| ResourceFootprint {
        cpu,
        ram_gb,
        disk_gb,
    })
}

fn timestamp(offset_secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 19, 12, 0, 0).unwrap() + chrono::Duration::seconds(offset_secs)
}

/// The decision step of a request lifecycle
#[derive(Debug, Clone, Copy)]
enum DecisionStep {
    Approved,
    AutoApproved,
    Rejected,
    Cancelled,
}

fn decision_step() -> impl Strategy<Value = DecisionStep> {
    prop_oneof![
        Just(DecisionStep::Approved),
        Just(DecisionStep::AutoApproved),
        Just(DecisionStep::Rejected),
        Just(DecisionStep::Cancelled),
    ]
}

/// Build a legal event sequence: Created, a decision, and (for approvals)
/// an optional provisioning tail.
fn lifecycle(
    id: VmRequestId,
    size: VmSize,
    step: DecisionStep,
    provision: bool,
) -> Vec<VmRequestEvent> {
    let requester_id = UserId::new();
    let mut events = vec![VmRequestEvent::Created(RequestCreated {
        event_version: 1,
        event_id: Uuid::now_v7(),
        aggregate_id: id,
        timestamp: timestamp(0),
        correlation_id: Uuid::now_v7(),
        causation_id: None,
        tenant_id: TenantId::new(),
        project_id: ProjectId::new(),
        vm_name: VmName::new("replay-target").unwrap(),
        size,
        justification: Reason::new("Deterministic replay coverage").unwrap(),
        requester_id,
        requester_email: "dev@example.com".to_string(),
    })];

    let approved = match step {
        DecisionStep::Approved => {
            events.push(VmRequestEvent::Approved(RequestApproved {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: timestamp(1),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                approver_id: UserId::new(),
            }));
            true
        }
        DecisionStep::AutoApproved => {
            events.push(VmRequestEvent::AutoApproved(RequestAutoApproved {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: timestamp(1),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                rule: "auto-approve-small-dev".to_string(),
            }));
            true
        }
        DecisionStep::Rejected => {
            events.push(VmRequestEvent::Rejected(RequestRejected {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: timestamp(1),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                rejected_by: None,
                reason: Reason::new("project quota exceeded").unwrap(),
            }));
            false
        }
        DecisionStep::Cancelled => {
            events.push(VmRequestEvent::Cancelled(RequestCancelled {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: timestamp(1),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                cancelled_by: requester_id,
            }));
            false
        }
    };

    if approved && provision {
        let vm_id = VmId::new();
        events.push(VmRequestEvent::ProvisioningStarted(
            RequestProvisioningStarted {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: timestamp(2),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                vm_id,
            },
        ));
        events.push(VmRequestEvent::Ready(RequestReady {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            timestamp: timestamp(3),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            vm_id,
        }));
    }

    events
}

// ============================================================================
// Replay Properties
// ============================================================================

proptest! {
    /// Property: replaying the same event stream twice yields identical
    /// state. This is the foundation of event sourcing; any divergence
    /// means hidden inputs leaked into the fold.
    #[test]
    fn prop_replay_is_deterministic(
        size in vm_size(),
        step in decision_step(),
        provision in any::<bool>(),
    ) {
        let id = VmRequestId::new();
        let events = lifecycle(id, size, step, provision);

        let first = VmRequestState::from_events(id, &events);
        let second = VmRequestState::from_events(id, &events);
        prop_assert_eq!(first, second);
    }

    /// Property: the folded version always equals the event count
    #[test]
    fn prop_version_equals_event_count(
        size in vm_size(),
        step in decision_step(),
        provision in any::<bool>(),
    ) {
        let id = VmRequestId::new();
        let events = lifecycle(id, size, step, provision);

        let state = VmRequestState::from_events(id, &events);
        prop_assert_eq!(state.version, events.len() as u64);
    }

    /// Property: folding incrementally and folding in one pass agree
    #[test]
    fn prop_incremental_fold_matches_batch_fold(
        size in vm_size(),
        step in decision_step(),
        provision in any::<bool>(),
    ) {
        let id = VmRequestId::new();
        let events = lifecycle(id, size, step, provision);

        let mut incremental = VmRequestState::default_for(id);
        for event in &events {
            incremental = apply_event(incremental, event);
        }

        prop_assert_eq!(incremental, VmRequestState::from_events(id, &events));
    }

    /// Property: a replayed request always ends in a status reachable from
    /// PendingApproval, never back in Draft
    #[test]
    fn prop_replay_never_returns_to_draft(
        size in vm_size(),
        step in decision_step(),
        provision in any::<bool>(),
    ) {
        let id = VmRequestId::new();
        let events = lifecycle(id, size, step, provision);

        let state = VmRequestState::from_events(id, &events);
        prop_assert!(state.is_initialized());
        prop_assert_ne!(state.status, RequestStatus::Draft);
    }
}

// ============================================================================
// Quota Properties
// ============================================================================

proptest! {
    /// Property: releasing what was reserved restores the original usage
    #[test]
    fn prop_reserve_release_roundtrip(
        base in footprint(),
        base_count in 0u32..50,
        extra in footprint(),
    ) {
        let usage = QuotaUsage { vm_count: base_count, resources: base };

        let after = usage.reserve(&extra).release(&extra);
        prop_assert_eq!(after, usage);
    }

    /// Property: an exact fit never counts as exceeding the quota
    #[test]
    fn prop_exact_fit_is_allowed(limit in footprint(), max_vms in 1u32..50) {
        let limits = QuotaLimits { max_vms, resources: limit };

        prop_assert!(!QuotaUsage::default().would_exceed(&limits, &limit));
    }

    /// Property: with the default rules, the docket never approves a
    /// request that would overflow the project quota
    #[test]
    fn prop_docket_never_approves_over_quota(
        size in vm_size(),
        ptype in project_type(),
        used in footprint(),
        used_count in 0u32..30,
        limit in footprint(),
        max_vms in 0u32..30,
    ) {
        let snapshot = RequestSnapshot {
            size,
            project_type: ptype,
            usage: QuotaUsage { vm_count: used_count, resources: used },
            limits: QuotaLimits { max_vms, resources: limit },
        };

        let decision = DocketEngine::with_default_rules().evaluate(&snapshot);
        if matches!(decision, Decision::Approve { .. }) {
            prop_assert!(!snapshot.quota_exceeded());
        }
    }

    /// Property: docket evaluation is pure; the same snapshot always gets
    /// the same decision
    #[test]
    fn prop_docket_is_deterministic(
        size in vm_size(),
        ptype in project_type(),
        used in footprint(),
        used_count in 0u32..30,
    ) {
        let snapshot = RequestSnapshot {
            size,
            project_type: ptype,
            usage: QuotaUsage { vm_count: used_count, resources: used },
            limits: QuotaLimits::development(),
        };

        let engine = DocketEngine::with_default_rules();
        prop_assert_eq!(engine.evaluate(&snapshot), engine.evaluate(&snapshot));
    }
}

// ============================================================================
// Value Object Boundaries
// ============================================================================

proptest! {
    /// Property: reason validation accepts exactly 10..=500 characters
    #[test]
    fn prop_reason_length_boundaries(len in 0usize..=600) {
        let text = "a".repeat(len);
        let result = Reason::new(text);

        if (Reason::MIN_LENGTH..=Reason::MAX_LENGTH).contains(&len) {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }

    /// Property: sizes serialize to their uppercase letter and round-trip
    #[test]
    fn prop_vm_size_serde_roundtrip(size in vm_size()) {
        let json = serde_json::to_string(&size).unwrap();
        prop_assert_eq!(json, format!("\"{}\"", size));

        let back: VmSize = serde_json::from_str(&format!("\"{}\"", size)).unwrap();
        prop_assert_eq!(back, size);
    }
}
