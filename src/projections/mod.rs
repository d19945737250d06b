// Copyright (c) 2025 - Cowboy AI, Inc.
//! Read Model Projections
//!
//! Projections map the event stream onto query-side views. They are:
//!
//! - **Ordered**: events applied in stream sequence
//! - **Idempotent**: re-applying a delivered event changes nothing, so
//!   at-least-once delivery is safe
//! - **Non-authoritative**: command handling never reads a projection;
//!   views may lag the stream
//!
//! ```text
//! EventStream ──────▶ RequestSummaryProjection (one row per request)
//!        └──────────▶ TimelineProjection (audit trail per request)
//! ```
//!
//! Projection failures are reported to the caller, who logs and moves on;
//! a broken view is rebuilt by replay, never by failing the write.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::{ProjectId, TenantId, UserId, VmId, VmRequestId, VmSize};
use crate::event_store::StoredEvent;
use crate::events::{PlatformEvent, RequestStatus, VmRequestEvent};

/// Errors that can occur during projection
#[derive(Debug, Clone, Error)]
pub enum ProjectionError {
    /// Projection target is not available
    #[error("projection target unavailable: {0}")]
    TargetUnavailable(String),

    /// Event cannot be projected (malformed, unknown type, etc.)
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

/// Projection adapter over the persisted event envelope
///
/// Implementations must preserve:
/// - **Event order**: events applied in sequence
/// - **Idempotency**: re-applying the same event produces the same state
#[async_trait]
pub trait ProjectionAdapter: Send + Sync {
    /// Apply one persisted event to the view
    async fn project(&self, event: &StoredEvent) -> Result<(), ProjectionError>;

    /// Clear all projected state, ahead of a replay
    async fn reset(&self);

    /// Name of this projection, for logs
    fn name(&self) -> &str;
}

/// One row per request: the current view of its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSummaryRow {
    pub request_id: VmRequestId,
    pub tenant_id: TenantId,
    pub project_id: ProjectId,
    pub vm_name: String,
    pub size: VmSize,
    pub status: RequestStatus,
    pub requester_id: UserId,
    pub requester_email: String,

    /// Admin who decided, when a human decided
    pub decided_by: Option<UserId>,

    /// Policy rule that auto-approved
    pub auto_approved_rule: Option<String>,

    /// Rejection reason, if rejected
    pub rejection_reason: Option<String>,

    /// Failure message shown to the user, if provisioning failed
    pub failure_message: Option<String>,

    /// Vm aggregate, once provisioning started
    pub vm_id: Option<VmId>,

    /// Last applied stream sequence; the idempotency watermark
    pub last_sequence: u64,

    pub updated_at: DateTime<Utc>,
}

/// Current-state view of all requests
#[derive(Default)]
pub struct RequestSummaryProjection {
    rows: RwLock<HashMap<VmRequestId, RequestSummaryRow>>,
}

impl RequestSummaryProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up one request's row
    pub async fn get(&self, request_id: VmRequestId) -> Option<RequestSummaryRow> {
        self.rows.read().await.get(&request_id).cloned()
    }

    /// All rows for a tenant
    pub async fn list_for_tenant(&self, tenant_id: TenantId) -> Vec<RequestSummaryRow> {
        let rows = self.rows.read().await;
        let mut result: Vec<RequestSummaryRow> = rows
            .values()
            .filter(|row| row.tenant_id == tenant_id)
            .cloned()
            .collect();
        result.sort_by_key(|row| row.request_id.as_uuid());
        result
    }
}

#[async_trait]
impl ProjectionAdapter for RequestSummaryProjection {
    async fn project(&self, stored: &StoredEvent) -> Result<(), ProjectionError> {
        let event = match &stored.data {
            PlatformEvent::VmRequest(event) => event,
            // Vm and Project events do not feed this view
            _ => return Ok(()),
        };

        let mut rows = self.rows.write().await;
        let request_id = event.aggregate_id();

        match event {
            VmRequestEvent::Created(e) => {
                // Replayed creations keep the newer row
                if let Some(existing) = rows.get(&request_id) {
                    if existing.last_sequence >= stored.sequence {
                        return Ok(());
                    }
                }
                rows.insert(
                    request_id,
                    RequestSummaryRow {
                        request_id,
                        tenant_id: e.tenant_id,
                        project_id: e.project_id,
                        vm_name: e.vm_name.as_str().to_string(),
                        size: e.size,
                        status: RequestStatus::PendingApproval,
                        requester_id: e.requester_id,
                        requester_email: e.requester_email.clone(),
                        decided_by: None,
                        auto_approved_rule: None,
                        rejection_reason: None,
                        failure_message: None,
                        vm_id: None,
                        last_sequence: stored.sequence,
                        updated_at: e.timestamp,
                    },
                );
                Ok(())
            }
            _ => {
                let row = rows.get_mut(&request_id).ok_or_else(|| {
                    ProjectionError::InvalidEvent(format!(
                        "{} for unknown request {}",
                        stored.event_type, request_id
                    ))
                })?;

                // Idempotency: drop events at or below the watermark
                if stored.sequence <= row.last_sequence {
                    return Ok(());
                }

                match event {
                    VmRequestEvent::Created(_) => unreachable!("handled above"),
                    VmRequestEvent::Approved(e) => {
                        row.status = RequestStatus::Approved;
                        row.decided_by = Some(e.approver_id);
                    }
                    VmRequestEvent::AutoApproved(e) => {
                        row.status = RequestStatus::Approved;
                        row.auto_approved_rule = Some(e.rule.clone());
                    }
                    VmRequestEvent::Rejected(e) => {
                        row.status = RequestStatus::Rejected;
                        row.decided_by = e.rejected_by;
                        row.rejection_reason = Some(e.reason.as_str().to_string());
                    }
                    VmRequestEvent::Cancelled(_) => {
                        row.status = RequestStatus::Cancelled;
                    }
                    VmRequestEvent::ProvisioningStarted(e) => {
                        row.status = RequestStatus::ProvisioningStarted;
                        row.vm_id = Some(e.vm_id);
                    }
                    VmRequestEvent::Ready(e) => {
                        row.status = RequestStatus::Ready;
                        row.vm_id = Some(e.vm_id);
                    }
                    VmRequestEvent::Failed(e) => {
                        row.status = RequestStatus::Failed;
                        row.failure_message = Some(e.user_message.clone());
                    }
                }

                row.last_sequence = stored.sequence;
                row.updated_at = event.timestamp();
                Ok(())
            }
        }
    }

    async fn reset(&self) {
        self.rows.write().await.clear();
    }

    fn name(&self) -> &str {
        "request_summary"
    }
}

/// One audit-trail entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    pub sequence: u64,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-request audit trail, ordered by stream sequence
///
/// Keyed by sequence, so redelivered events overwrite their own slot
/// instead of duplicating entries.
#[derive(Default)]
pub struct TimelineProjection {
    timelines: RwLock<HashMap<VmRequestId, BTreeMap<u64, TimelineEntry>>>,
}

impl TimelineProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered audit trail for one request
    pub async fn timeline(&self, request_id: VmRequestId) -> Vec<TimelineEntry> {
        self.timelines
            .read()
            .await
            .get(&request_id)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProjectionAdapter for TimelineProjection {
    async fn project(&self, stored: &StoredEvent) -> Result<(), ProjectionError> {
        let request_id = match &stored.data {
            PlatformEvent::VmRequest(event) => event.aggregate_id(),
            _ => return Ok(()),
        };

        let mut timelines = self.timelines.write().await;
        timelines.entry(request_id).or_default().insert(
            stored.sequence,
            TimelineEntry {
                sequence: stored.sequence,
                event_type: stored.event_type.clone(),
                timestamp: stored.timestamp,
            },
        );
        Ok(())
    }

    async fn reset(&self) {
        self.timelines.write().await.clear();
    }

    fn name(&self) -> &str {
        "timeline"
    }
}

/// The platform's standing read models, updated together
#[derive(Default)]
pub struct Projections {
    pub summary: RequestSummaryProjection,
    pub timeline: TimelineProjection,
}

impl Projections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one persisted event to every view.
    ///
    /// Returns the names of projections that failed; the caller logs them.
    pub async fn apply(&self, stored: &StoredEvent) -> Vec<(&str, ProjectionError)> {
        let mut failures = Vec::new();
        if let Err(err) = self.summary.project(stored).await {
            failures.push((self.summary.name(), err));
        }
        if let Err(err) = self.timeline.project(stored).await {
            failures.push((self.timeline.name(), err));
        }
        failures
    }

    /// Rebuild every view from a full event history
    pub async fn rebuild(&self, history: &[StoredEvent]) -> Vec<(&str, ProjectionError)> {
        self.summary.reset().await;
        self.timeline.reset().await;

        let mut failures = Vec::new();
        for stored in history {
            failures.extend(self.apply(stored).await);
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Reason, VmName};
    use crate::events::vm_request::{RequestAutoApproved, RequestCreated};
    use uuid::Uuid;

    fn stored_created(id: VmRequestId, tenant_id: TenantId) -> StoredEvent {
        StoredEvent::envelop(
            PlatformEvent::VmRequest(VmRequestEvent::Created(RequestCreated {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: Utc::now(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                tenant_id,
                project_id: ProjectId::new(),
                vm_name: VmName::new("proj-test").unwrap(),
                size: VmSize::S,
                justification: Reason::new("projection regression coverage").unwrap(),
                requester_id: UserId::new(),
                requester_email: "dev@example.com".to_string(),
            })),
            1,
        )
    }

    fn stored_auto_approved(id: VmRequestId, sequence: u64) -> StoredEvent {
        StoredEvent::envelop(
            PlatformEvent::VmRequest(VmRequestEvent::AutoApproved(RequestAutoApproved {
                event_version: 1,
                event_id: Uuid::now_v7(),
                aggregate_id: id,
                timestamp: Utc::now(),
                correlation_id: Uuid::now_v7(),
                causation_id: None,
                rule: "auto-approve-small-dev".to_string(),
            })),
            sequence,
        )
    }

    #[tokio::test]
    async fn test_summary_tracks_lifecycle() {
        let projections = Projections::new();
        let id = VmRequestId::new();
        let tenant_id = TenantId::new();

        assert!(projections
            .apply(&stored_created(id, tenant_id))
            .await
            .is_empty());
        assert!(projections
            .apply(&stored_auto_approved(id, 2))
            .await
            .is_empty());

        let row = projections.summary.get(id).await.unwrap();
        assert_eq!(row.status, RequestStatus::Approved);
        assert_eq!(
            row.auto_approved_rule.as_deref(),
            Some("auto-approve-small-dev")
        );
        assert_eq!(row.last_sequence, 2);
    }

    #[tokio::test]
    async fn test_redelivery_is_idempotent() {
        let projections = Projections::new();
        let id = VmRequestId::new();
        let tenant_id = TenantId::new();

        let created = stored_created(id, tenant_id);
        let approved = stored_auto_approved(id, 2);

        projections.apply(&created).await;
        projections.apply(&approved).await;
        let before = projections.summary.get(id).await.unwrap();
        let timeline_before = projections.timeline.timeline(id).await;

        // At-least-once delivery replays both events
        projections.apply(&created).await;
        projections.apply(&approved).await;

        assert_eq!(projections.summary.get(id).await.unwrap(), before);
        assert_eq!(projections.timeline.timeline(id).await, timeline_before);
        assert_eq!(timeline_before.len(), 2);
    }

    #[tokio::test]
    async fn test_event_for_unknown_request_is_an_error() {
        let projections = Projections::new();
        let failures = projections
            .apply(&stored_auto_approved(VmRequestId::new(), 2))
            .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "request_summary");
    }

    #[tokio::test]
    async fn test_rebuild_from_history() {
        let projections = Projections::new();
        let id = VmRequestId::new();
        let tenant_id = TenantId::new();

        let history = vec![stored_created(id, tenant_id), stored_auto_approved(id, 2)];
        projections.apply(&history[0]).await;

        // Rebuild discards partial state and replays everything
        let failures = projections.rebuild(&history).await;
        assert!(failures.is_empty());

        let row = projections.summary.get(id).await.unwrap();
        assert_eq!(row.status, RequestStatus::Approved);

        let tenant_rows = projections.summary.list_for_tenant(tenant_id).await;
        assert_eq!(tenant_rows.len(), 1);
    }
}
