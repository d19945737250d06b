// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Project Aggregate
//!
//! Folds reservation events into current quota usage. The quota gate always
//! works against this folded state plus the stream version it was read at,
//! so concurrent reservations are serialized by the event store's
//! optimistic concurrency check rather than by any read-model state.

use chrono::{DateTime, Utc};

use crate::domain::{ProjectId, ProjectType, QuotaLimits, QuotaUsage, TenantId};
use crate::events::project::ProjectEvent;

/// Immutable Project State
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectState {
    /// Aggregate ID
    pub id: ProjectId,

    /// Tenant the project belongs to
    pub tenant_id: Option<TenantId>,

    /// Project classification, used by policy rules
    pub project_type: Option<ProjectType>,

    /// Quota ceiling
    pub limits: Option<QuotaLimits>,

    /// Current usage, folded from reservations
    pub usage: QuotaUsage,

    /// Stream version (event count); the optimistic concurrency token
    pub version: u64,

    /// First event timestamp
    pub created_at: Option<DateTime<Utc>>,

    /// Latest event timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProjectState {
    /// Create default empty state, used as the fold seed
    pub fn default_for(id: ProjectId) -> Self {
        Self {
            id,
            tenant_id: None,
            project_type: None,
            limits: None,
            usage: QuotaUsage::default(),
            version: 0,
            created_at: None,
            updated_at: None,
        }
    }

    /// Reconstruct state from event stream
    pub fn from_events(id: ProjectId, events: &[ProjectEvent]) -> Self {
        let initial = Self::default_for(id);
        events.iter().fold(initial, apply_event)
    }

    /// Check if aggregate is initialized (has events)
    pub fn is_initialized(&self) -> bool {
        self.created_at.is_some()
    }
}

/// Apply event to state (pure function)
pub fn apply_event(state: ProjectState, event: &ProjectEvent) -> ProjectState {
    let version = state.version + 1;

    match event {
        ProjectEvent::Registered(e) => ProjectState {
            id: e.aggregate_id,
            tenant_id: Some(e.tenant_id),
            project_type: Some(e.project_type),
            limits: Some(e.limits),
            version,
            created_at: Some(e.timestamp),
            updated_at: Some(e.timestamp),
            ..state
        },

        ProjectEvent::QuotaReserved(e) => ProjectState {
            usage: state.usage.reserve(&e.footprint),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },

        ProjectEvent::QuotaReleased(e) => ProjectState {
            usage: state.usage.release(&e.footprint),
            version,
            updated_at: Some(e.timestamp),
            ..state
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{VmRequestId, VmSize};
    use crate::events::project::{ProjectRegistered, QuotaReleased, QuotaReserved};
    use uuid::Uuid;

    fn registered(id: ProjectId) -> ProjectEvent {
        ProjectEvent::Registered(ProjectRegistered {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            tenant_id: TenantId::new(),
            project_type: ProjectType::Development,
            limits: QuotaLimits::development(),
        })
    }

    fn reserved(id: ProjectId, size: VmSize) -> ProjectEvent {
        ProjectEvent::QuotaReserved(QuotaReserved {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            request_id: VmRequestId::new(),
            footprint: size.footprint(),
        })
    }

    #[test]
    fn test_usage_folds_from_reservations() {
        let id = ProjectId::new();
        let events = vec![
            registered(id),
            reserved(id, VmSize::S),
            reserved(id, VmSize::M),
        ];

        let state = ProjectState::from_events(id, &events);
        assert_eq!(state.usage.vm_count, 2);
        assert_eq!(
            state.usage.resources,
            VmSize::S.footprint().plus(&VmSize::M.footprint())
        );
        assert_eq!(state.version, 3);
    }

    #[test]
    fn test_release_undoes_reservation() {
        let id = ProjectId::new();
        let footprint = VmSize::L.footprint();

        let mut events = vec![registered(id), reserved(id, VmSize::L)];
        events.push(ProjectEvent::QuotaReleased(QuotaReleased {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: id,
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            request_id: VmRequestId::new(),
            footprint,
        }));

        let state = ProjectState::from_events(id, &events);
        assert_eq!(state.usage, QuotaUsage::default());
    }
}
