// Copyright (c) 2025 - Cowboy AI, Inc.
//! VmRequest Service Layer
//!
//! Application service coordinating the full request lifecycle:
//! - Command handling via pure functions
//! - Event persistence with optimistic concurrency
//! - Docket policy evaluation on submission
//! - Quota reservation against the project stream
//! - Resilient hypervisor provisioning
//! - Projection updates and best-effort notifications
//!
//! # Service Pattern
//!
//! ```text
//! Command → Service → Handler → Event → Event Store
//!                                  ↓
//!                             Projections
//!                                  ↓
//!                             Notifications
//! ```
//!
//! # Transaction Semantics
//!
//! Each write is a transaction:
//! 1. Load events from store
//! 2. Reconstruct current state
//! 3. Handle command (pure function)
//! 4. Append events at the observed version (optimistic concurrency)
//! 5. Update projections (failures logged, never propagated)
//!
//! # Quota Races
//!
//! Two requests racing for the last quota slot both evaluate against the
//! same project fold, but only one append at the observed project version
//! can land. The loser reloads, re-evaluates, and usually finds the quota
//! gone; the retry loop is bounded, and persistent contention falls back
//! to manual review rather than failing the submission.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::commands::*;
use crate::aggregate::handlers::*;
use crate::aggregate::{vm, vm_request};
use crate::aggregate::{ProjectState, VmRequestState, VmState};
use crate::context::{ContextError, RequestContext};
use crate::docket::{Decision, DocketEngine, RequestSnapshot};
use crate::domain::{ProjectId, ProjectType, QuotaLimits, VmId, VmName, VmRequestId, VmSize};
use crate::event_store::{EventStore, EventStoreError};
use crate::events::project::ProjectEvent;
use crate::events::vm::VmEvent;
use crate::events::vm_request::{RequestStatus, VmRequestEvent};
use crate::events::PlatformEvent;
use crate::notify::{ApprovalNotice, NotificationPort, RejectionNotice};
use crate::projections::Projections;
use crate::provisioning::{HypervisorPort, ProgressFn, ResilientProvisioner, VmSpec};

/// Bounded retries against the project stream when reservations race
const MAX_QUOTA_RETRIES: u32 = 3;

/// Service layer result type
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service layer errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Command validation failed
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Caller context could not be resolved
    #[error("Context error: {0}")]
    Context(#[from] ContextError),

    /// Aggregate not found (or not visible to the caller's tenant)
    #[error("Not found: {0}")]
    NotFound(Uuid),

    /// The aggregate moved since the caller last read it
    #[error("Concurrency conflict: expected version {expected}, got {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    /// Event store error
    #[error("Event store error: {0}")]
    Persistence(String),
}

fn map_store_err(err: EventStoreError) -> ServiceError {
    match err {
        EventStoreError::ConcurrencyConflict { expected, actual } => {
            ServiceError::ConcurrencyConflict { expected, actual }
        }
        other => ServiceError::Persistence(other.to_string()),
    }
}

fn missing_field(field: &str) -> ServiceError {
    ServiceError::Persistence(format!("initialized aggregate missing {field}"))
}

/// Submission input, carried alongside the caller's [`RequestContext`]
#[derive(Debug, Clone)]
pub struct NewVmRequest {
    pub project_id: ProjectId,
    pub vm_name: VmName,
    pub size: VmSize,
    pub justification: String,
    pub requester_email: String,
}

/// Result of a submission after docket evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    pub request_id: VmRequestId,

    /// Status the request landed in (`ProvisioningStarted` for an
    /// auto-approval, `Rejected`, or `PendingApproval` for manual review)
    pub status: RequestStatus,

    /// The docket decision that produced the status
    pub decision: Decision,
}

/// Result of driving one provisioning saga to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub request_id: VmRequestId,
    pub vm_id: VmId,

    /// `Ready` or `Failed`
    pub status: RequestStatus,

    /// Hypervisor machine reference on success
    pub machine_ref: Option<String>,

    /// Attempts the final outcome took
    pub attempts: u32,
}

/// Event-sourced VM request service
///
/// Dependencies are injected at construction; the service owns no I/O of
/// its own beyond what the ports provide.
pub struct VmRequestService<S, H, N>
where
    S: EventStore,
    H: HypervisorPort,
    N: NotificationPort,
{
    store: Arc<S>,
    docket: DocketEngine,
    provisioner: ResilientProvisioner<H>,
    notifier: Arc<N>,
    projections: Arc<Projections>,
}

impl<S, H, N> VmRequestService<S, H, N>
where
    S: EventStore,
    H: HypervisorPort,
    N: NotificationPort,
{
    pub fn new(
        store: Arc<S>,
        docket: DocketEngine,
        provisioner: ResilientProvisioner<H>,
        notifier: Arc<N>,
        projections: Arc<Projections>,
    ) -> Self {
        Self {
            store,
            docket,
            provisioner,
            notifier,
            projections,
        }
    }

    /// The service's read models
    pub fn projections(&self) -> &Projections {
        &self.projections
    }

    /// Register a project with its quota limits.
    ///
    /// When no explicit limits are given, the defaults for the project
    /// type apply.
    pub async fn register_project(
        &self,
        ctx: &RequestContext,
        project_type: ProjectType,
        limits: Option<QuotaLimits>,
    ) -> ServiceResult<ProjectId> {
        let project_id = ProjectId::new();
        let limits = limits.unwrap_or_else(|| match project_type {
            ProjectType::Development => QuotaLimits::development(),
            ProjectType::Production => QuotaLimits::production(),
        });

        let initial = ProjectState::default_for(project_id);
        let event = handle_register_project(
            &initial,
            RegisterProjectCommand {
                tenant_id: ctx.tenant_id,
                project_type,
                limits,
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
            },
        )?;

        self.append_and_project(
            project_id.as_uuid(),
            vec![PlatformEvent::Project(ProjectEvent::Registered(event))],
            0,
        )
        .await?;

        info!(project_id = %project_id, %project_type, "project registered");
        Ok(project_id)
    }

    /// Submit a VM request and run it through the docket.
    ///
    /// The `Created` event is always persisted first; the docket decision
    /// lands as a second event on the same stream. Auto-approval reserves
    /// quota on the project stream before the approval event is written,
    /// then records `ProvisioningStarted` and opens the Vm stream, so an
    /// auto-approved submission returns with provisioning already pending.
    pub async fn create_request(
        &self,
        ctx: &RequestContext,
        input: NewVmRequest,
    ) -> ServiceResult<CreateOutcome> {
        let request_id = VmRequestId::new();

        let initial = VmRequestState::default_for(request_id);
        let created = handle_create_request(
            &initial,
            CreateVmRequestCommand {
                tenant_id: ctx.tenant_id,
                project_id: input.project_id,
                vm_name: input.vm_name.clone(),
                size: input.size,
                justification: input.justification.clone(),
                requester_id: ctx.user_id,
                requester_email: input.requester_email.clone(),
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
            },
            request_id,
        )?;
        let created_event_id = created.event_id;
        let state = vm_request::apply_event(initial, &VmRequestEvent::Created(created.clone()));

        self.append_and_project(
            request_id.as_uuid(),
            vec![PlatformEvent::VmRequest(VmRequestEvent::Created(created))],
            0,
        )
        .await?;

        for attempt in 0..MAX_QUOTA_RETRIES {
            let project = self.load_project(ctx, input.project_id).await?;
            let snapshot = RequestSnapshot {
                size: input.size,
                project_type: project
                    .project_type
                    .ok_or_else(|| missing_field("project_type"))?,
                usage: project.usage,
                limits: project.limits.ok_or_else(|| missing_field("limits"))?,
            };

            let decision = self.docket.evaluate(&snapshot);
            match &decision {
                Decision::Approve { rule } => {
                    let rule = rule.clone();
                    let reserved = handle_reserve_quota(
                        &project,
                        ReserveQuotaCommand {
                            request_id,
                            footprint: input.size.footprint(),
                            timestamp: Utc::now(),
                            correlation_id: ctx.correlation_id,
                            causation_id: Some(created_event_id),
                        },
                    )?;

                    match self
                        .append_and_project(
                            input.project_id.as_uuid(),
                            vec![PlatformEvent::Project(ProjectEvent::QuotaReserved(
                                reserved,
                            ))],
                            project.version,
                        )
                        .await
                    {
                        Ok(_) => {}
                        Err(ServiceError::ConcurrencyConflict { .. }) => {
                            // Lost the reservation race; re-evaluate on
                            // the moved project state.
                            debug!(
                                request_id = %request_id,
                                attempt,
                                "quota reservation raced, re-evaluating"
                            );
                            continue;
                        }
                        Err(err) => return Err(err),
                    }

                    let approved = handle_auto_approve_request(
                        &state,
                        AutoApproveRequestCommand {
                            rule: rule.clone(),
                            timestamp: Utc::now(),
                            correlation_id: ctx.correlation_id,
                            causation_id: Some(created_event_id),
                        },
                    )?;
                    let approved_event_id = approved.event_id;
                    let request_version = state.version;
                    let approved_state = vm_request::apply_event(
                        state.clone(),
                        &VmRequestEvent::AutoApproved(approved.clone()),
                    );
                    self.append_and_project(
                        request_id.as_uuid(),
                        vec![PlatformEvent::VmRequest(VmRequestEvent::AutoApproved(
                            approved,
                        ))],
                        request_version,
                    )
                    .await?;

                    // Auto-approval flows straight into provisioning: the
                    // submission records ProvisioningStarted and opens the
                    // Vm stream; the saga resumes from there.
                    let (approved_state, _, _, _) = self
                        .begin_provisioning(ctx, approved_state, Some(approved_event_id))
                        .await?;

                    self.notify_approved(&approved_state, Some(rule.clone()))
                        .await;
                    info!(request_id = %request_id, rule = %rule, "request auto-approved");
                    return Ok(CreateOutcome {
                        request_id,
                        status: RequestStatus::ProvisioningStarted,
                        decision,
                    });
                }

                Decision::Reject { rule, reason } => {
                    let (rule, reason) = (rule.clone(), reason.clone());
                    let rejected = handle_reject_request(
                        &state,
                        RejectRequestCommand {
                            rejected_by: None,
                            reason: reason.clone(),
                            timestamp: Utc::now(),
                            correlation_id: ctx.correlation_id,
                            causation_id: Some(created_event_id),
                        },
                    )?;
                    self.append_and_project(
                        request_id.as_uuid(),
                        vec![PlatformEvent::VmRequest(VmRequestEvent::Rejected(rejected))],
                        state.version,
                    )
                    .await?;

                    self.notify_rejected(&state, &reason).await;
                    info!(request_id = %request_id, rule = %rule, "request rejected by policy");
                    return Ok(CreateOutcome {
                        request_id,
                        status: RequestStatus::Rejected,
                        decision,
                    });
                }

                Decision::ManualReview => {
                    info!(request_id = %request_id, "request routed to manual review");
                    return Ok(CreateOutcome {
                        request_id,
                        status: RequestStatus::PendingApproval,
                        decision,
                    });
                }
            }
        }

        // Persistent contention on the project stream; let an admin decide
        // rather than failing the submission after Created is persisted.
        warn!(
            request_id = %request_id,
            retries = MAX_QUOTA_RETRIES,
            "quota reservation kept racing, falling back to manual review"
        );
        Ok(CreateOutcome {
            request_id,
            status: RequestStatus::PendingApproval,
            decision: Decision::ManualReview,
        })
    }

    /// Approve a pending request.
    ///
    /// `expected_version` is the stream version the admin's view was based
    /// on; a stale version is rejected before any handler runs. Quota is
    /// reserved before the approval event lands.
    pub async fn approve(
        &self,
        ctx: &RequestContext,
        request_id: VmRequestId,
        expected_version: u64,
    ) -> ServiceResult<()> {
        let state = self.load_request(ctx, request_id).await?;
        if state.version != expected_version {
            return Err(ServiceError::ConcurrencyConflict {
                expected: expected_version,
                actual: state.version,
            });
        }

        let approved = handle_approve_request(
            &state,
            ApproveRequestCommand {
                approver_id: ctx.user_id,
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
                causation_id: None,
            },
        )?;

        let project_id = state.project_id.ok_or_else(|| missing_field("project_id"))?;
        let size = state.size.ok_or_else(|| missing_field("size"))?;
        self.reserve_quota(ctx, project_id, request_id, size, Some(approved.event_id))
            .await?;

        // The reservation is already on the project stream. If the approval
        // append loses to a concurrent write on the request stream (say the
        // requester cancelled in the meantime), give the footprint back.
        if let Err(err) = self
            .append_and_project(
                request_id.as_uuid(),
                vec![PlatformEvent::VmRequest(VmRequestEvent::Approved(approved))],
                expected_version,
            )
            .await
        {
            self.release_quota(ctx, project_id, request_id, size).await;
            return Err(err);
        }

        self.notify_approved(&state, None).await;
        info!(request_id = %request_id, approver = %ctx.user_id, "request approved");
        Ok(())
    }

    /// Reject a pending request with a reason
    pub async fn reject(
        &self,
        ctx: &RequestContext,
        request_id: VmRequestId,
        reason: String,
        expected_version: u64,
    ) -> ServiceResult<()> {
        let state = self.load_request(ctx, request_id).await?;
        if state.version != expected_version {
            return Err(ServiceError::ConcurrencyConflict {
                expected: expected_version,
                actual: state.version,
            });
        }

        let rejected = handle_reject_request(
            &state,
            RejectRequestCommand {
                rejected_by: Some(ctx.user_id),
                reason: reason.clone(),
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
                causation_id: None,
            },
        )?;

        self.append_and_project(
            request_id.as_uuid(),
            vec![PlatformEvent::VmRequest(VmRequestEvent::Rejected(rejected))],
            expected_version,
        )
        .await?;

        self.notify_rejected(&state, &reason).await;
        info!(request_id = %request_id, "request rejected");
        Ok(())
    }

    /// Withdraw a pending request; only the requester may do this
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        request_id: VmRequestId,
        expected_version: u64,
    ) -> ServiceResult<()> {
        let state = self.load_request(ctx, request_id).await?;
        if state.version != expected_version {
            return Err(ServiceError::ConcurrencyConflict {
                expected: expected_version,
                actual: state.version,
            });
        }

        let cancelled = handle_cancel_request(
            &state,
            CancelRequestCommand {
                cancelled_by: ctx.user_id,
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
                causation_id: None,
            },
        )?;

        self.append_and_project(
            request_id.as_uuid(),
            vec![PlatformEvent::VmRequest(VmRequestEvent::Cancelled(
                cancelled,
            ))],
            expected_version,
        )
        .await?;

        info!(request_id = %request_id, "request cancelled");
        Ok(())
    }

    /// Drive an approved request through provisioning to a terminal state.
    ///
    /// For a manually approved request this opens the Vm stream itself;
    /// an auto-approved submission arrives with both streams already in
    /// ProvisioningStarted and the saga resumes from them. Either way the
    /// resilient provisioner runs and the outcome lands on both streams.
    /// A failed saga is a successful call: the failure is captured in
    /// events and reported, not raised.
    pub async fn run_provisioning(
        &self,
        ctx: &RequestContext,
        request_id: VmRequestId,
    ) -> ServiceResult<ProvisioningReport> {
        let state = self.load_request(ctx, request_id).await?;

        let (state, vm_id, vm_state, causation_id) =
            if state.status == RequestStatus::ProvisioningStarted {
                let vm_id = state.vm_id.ok_or_else(|| missing_field("vm_id"))?;
                let vm_state = self.load_vm(vm_id).await?;
                (state, vm_id, vm_state, None)
            } else {
                let (state, vm_id, vm_state, vm_started_event_id) =
                    self.begin_provisioning(ctx, state, None).await?;
                (state, vm_id, vm_state, Some(vm_started_event_id))
            };

        let vm_name = state.vm_name.clone().ok_or_else(|| missing_field("vm_name"))?;
        let size = state.size.ok_or_else(|| missing_field("size"))?;

        let spec = VmSpec {
            name: vm_name,
            size,
        };
        let progress: ProgressFn = Arc::new({
            let request_id = request_id;
            move |stage| {
                debug!(request_id = %request_id, %stage, "provisioning stage");
            }
        });

        match self.provisioner.create_vm(&spec, progress).await {
            Ok(outcome) => {
                let provisioned = handle_complete_vm_provisioning(
                    &vm_state,
                    CompleteVmProvisioningCommand {
                        machine_ref: outcome.result.machine_ref.clone(),
                        attempts: outcome.attempts,
                        timestamp: Utc::now(),
                        correlation_id: ctx.correlation_id,
                        causation_id,
                    },
                )?;
                let provisioned_event_id = provisioned.event_id;
                self.append_and_project(
                    vm_id.as_uuid(),
                    vec![PlatformEvent::Vm(VmEvent::Provisioned(provisioned))],
                    vm_state.version,
                )
                .await?;

                let ready = handle_mark_ready(
                    &state,
                    MarkReadyCommand {
                        vm_id,
                        timestamp: Utc::now(),
                        correlation_id: ctx.correlation_id,
                        causation_id: Some(provisioned_event_id),
                    },
                )?;
                self.append_and_project(
                    request_id.as_uuid(),
                    vec![PlatformEvent::VmRequest(VmRequestEvent::Ready(ready))],
                    state.version,
                )
                .await?;

                info!(
                    request_id = %request_id,
                    vm_id = %vm_id,
                    machine_ref = %outcome.result.machine_ref,
                    "request provisioned"
                );
                Ok(ProvisioningReport {
                    request_id,
                    vm_id,
                    status: RequestStatus::Ready,
                    machine_ref: Some(outcome.result.machine_ref),
                    attempts: outcome.attempts,
                })
            }
            Err(err) => {
                let failed = handle_fail_vm_provisioning(
                    &vm_state,
                    FailVmProvisioningCommand {
                        error_code: err.error_code(),
                        user_message: err.user_message().to_string(),
                        attempts: err.attempts(),
                        timestamp: Utc::now(),
                        correlation_id: ctx.correlation_id,
                        causation_id,
                    },
                )?;
                let failed_event_id = failed.event_id;
                self.append_and_project(
                    vm_id.as_uuid(),
                    vec![PlatformEvent::Vm(VmEvent::ProvisioningFailed(failed))],
                    vm_state.version,
                )
                .await?;

                let request_failed = handle_mark_failed(
                    &state,
                    MarkFailedCommand {
                        error_code: err.error_code(),
                        user_message: err.user_message().to_string(),
                        timestamp: Utc::now(),
                        correlation_id: ctx.correlation_id,
                        causation_id: Some(failed_event_id),
                    },
                )?;
                self.append_and_project(
                    request_id.as_uuid(),
                    vec![PlatformEvent::VmRequest(VmRequestEvent::Failed(
                        request_failed,
                    ))],
                    state.version,
                )
                .await?;

                // The failed request holds no capacity
                if let (Some(project_id), Some(size)) = (state.project_id, state.size) {
                    self.release_quota(ctx, project_id, request_id, size).await;
                }

                warn!(
                    request_id = %request_id,
                    vm_id = %vm_id,
                    error = %err,
                    "provisioning saga failed"
                );
                Ok(ProvisioningReport {
                    request_id,
                    vm_id,
                    status: RequestStatus::Failed,
                    machine_ref: None,
                    attempts: err.attempts(),
                })
            }
        }
    }

    /// Current write-side state of a request
    pub async fn get_request(
        &self,
        ctx: &RequestContext,
        request_id: VmRequestId,
    ) -> ServiceResult<VmRequestState> {
        self.load_request(ctx, request_id).await
    }

    /// Current write-side state of a project
    pub async fn get_project(
        &self,
        ctx: &RequestContext,
        project_id: ProjectId,
    ) -> ServiceResult<ProjectState> {
        self.load_project(ctx, project_id).await
    }

    // ---- internals ----

    /// Append at the observed version, then feed the new events to every
    /// projection. Projection failures are logged and swallowed; the write
    /// already happened.
    async fn append_and_project(
        &self,
        aggregate_id: Uuid,
        events: Vec<PlatformEvent>,
        expected_version: u64,
    ) -> ServiceResult<u64> {
        let new_version = self
            .store
            .append(aggregate_id, events, expected_version)
            .await
            .map_err(map_store_err)?;

        let stored = self
            .store
            .read_events_from(aggregate_id, expected_version + 1)
            .await
            .map_err(map_store_err)?;
        for event in &stored {
            for (projection, err) in self.projections.apply(event).await {
                warn!(
                    projection,
                    event_type = %event.event_type,
                    error = %err,
                    "projection update failed"
                );
            }
        }

        Ok(new_version)
    }

    /// Record ProvisioningStarted on the request stream and open a fresh
    /// Vm stream for it.
    ///
    /// Returns the folded request state, the new Vm's id and state, and
    /// the Vm stream's opening event id for causation chaining.
    async fn begin_provisioning(
        &self,
        ctx: &RequestContext,
        state: VmRequestState,
        causation_id: Option<Uuid>,
    ) -> ServiceResult<(VmRequestState, VmId, VmState, Uuid)> {
        let request_id = state.id;
        let vm_id = VmId::new();
        let started = handle_start_provisioning(
            &state,
            StartProvisioningCommand {
                vm_id,
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
                causation_id,
            },
        )?;
        let started_event_id = started.event_id;
        let request_version = state.version;
        let state = vm_request::apply_event(
            state,
            &VmRequestEvent::ProvisioningStarted(started.clone()),
        );

        self.append_and_project(
            request_id.as_uuid(),
            vec![PlatformEvent::VmRequest(VmRequestEvent::ProvisioningStarted(started))],
            request_version,
        )
        .await?;

        let vm_name = state.vm_name.clone().ok_or_else(|| missing_field("vm_name"))?;
        let size = state.size.ok_or_else(|| missing_field("size"))?;

        let vm_state = VmState::default_for(vm_id);
        let vm_started = handle_begin_vm_provisioning(
            &vm_state,
            BeginVmProvisioningCommand {
                request_id,
                vm_name,
                size,
                timestamp: Utc::now(),
                correlation_id: ctx.correlation_id,
                causation_id: Some(started_event_id),
            },
        )?;
        let vm_started_event_id = vm_started.event_id;
        let vm_state = vm::apply_event(vm_state, &VmEvent::ProvisioningStarted(vm_started.clone()));
        self.append_and_project(
            vm_id.as_uuid(),
            vec![PlatformEvent::Vm(VmEvent::ProvisioningStarted(vm_started))],
            0,
        )
        .await?;

        Ok((state, vm_id, vm_state, vm_started_event_id))
    }

    /// Fold the Vm stream. Reached only through a tenant-checked request
    /// load, so no tenant check of its own.
    async fn load_vm(&self, vm_id: VmId) -> ServiceResult<VmState> {
        let stored = self
            .store
            .read_events(vm_id.as_uuid())
            .await
            .map_err(map_store_err)?;

        let mut events = Vec::with_capacity(stored.len());
        for envelope in stored {
            match envelope.data {
                PlatformEvent::Vm(event) => events.push(event),
                other => {
                    return Err(ServiceError::Persistence(format!(
                        "unexpected {} event in vm stream",
                        other.event_type_name()
                    )))
                }
            }
        }

        let state = VmState::from_events(vm_id, &events);
        if !state.is_initialized() {
            return Err(ServiceError::NotFound(vm_id.as_uuid()));
        }
        Ok(state)
    }

    async fn load_request(
        &self,
        ctx: &RequestContext,
        request_id: VmRequestId,
    ) -> ServiceResult<VmRequestState> {
        let stored = self
            .store
            .read_events(request_id.as_uuid())
            .await
            .map_err(map_store_err)?;

        let mut events = Vec::with_capacity(stored.len());
        for envelope in stored {
            match envelope.data {
                PlatformEvent::VmRequest(event) => events.push(event),
                other => {
                    return Err(ServiceError::Persistence(format!(
                        "unexpected {} event in request stream",
                        other.event_type_name()
                    )))
                }
            }
        }

        let state = VmRequestState::from_events(request_id, &events);

        // Tenant isolation: a request outside the caller's tenant does
        // not exist as far as the caller can tell.
        if !state.is_initialized() || state.tenant_id != Some(ctx.tenant_id) {
            return Err(ServiceError::NotFound(request_id.as_uuid()));
        }
        Ok(state)
    }

    async fn load_project(
        &self,
        ctx: &RequestContext,
        project_id: ProjectId,
    ) -> ServiceResult<ProjectState> {
        let stored = self
            .store
            .read_events(project_id.as_uuid())
            .await
            .map_err(map_store_err)?;

        let mut events = Vec::with_capacity(stored.len());
        for envelope in stored {
            match envelope.data {
                PlatformEvent::Project(event) => events.push(event),
                other => {
                    return Err(ServiceError::Persistence(format!(
                        "unexpected {} event in project stream",
                        other.event_type_name()
                    )))
                }
            }
        }

        let state = ProjectState::from_events(project_id, &events);
        if !state.is_initialized() || state.tenant_id != Some(ctx.tenant_id) {
            return Err(ServiceError::NotFound(project_id.as_uuid()));
        }
        Ok(state)
    }

    /// Reserve quota on the project stream, retrying lost races.
    ///
    /// A genuine quota overflow surfaces as
    /// [`CommandError::QuotaExceeded`]; exhausted retries surface the last
    /// conflict.
    async fn reserve_quota(
        &self,
        ctx: &RequestContext,
        project_id: ProjectId,
        request_id: VmRequestId,
        size: VmSize,
        causation_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        let mut last_conflict = None;

        for _ in 0..MAX_QUOTA_RETRIES {
            let project = self.load_project(ctx, project_id).await?;
            let reserved = handle_reserve_quota(
                &project,
                ReserveQuotaCommand {
                    request_id,
                    footprint: size.footprint(),
                    timestamp: Utc::now(),
                    correlation_id: ctx.correlation_id,
                    causation_id,
                },
            )?;

            match self
                .append_and_project(
                    project_id.as_uuid(),
                    vec![PlatformEvent::Project(ProjectEvent::QuotaReserved(
                        reserved,
                    ))],
                    project.version,
                )
                .await
            {
                Ok(_) => return Ok(()),
                Err(conflict @ ServiceError::ConcurrencyConflict { .. }) => {
                    last_conflict = Some(conflict);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_conflict
            .unwrap_or_else(|| ServiceError::Persistence("reservation retries exhausted".into())))
    }

    /// Release a reservation; best-effort, logged on persistent failure
    async fn release_quota(
        &self,
        ctx: &RequestContext,
        project_id: ProjectId,
        request_id: VmRequestId,
        size: VmSize,
    ) {
        for _ in 0..MAX_QUOTA_RETRIES {
            let project = match self.load_project(ctx, project_id).await {
                Ok(project) => project,
                Err(err) => {
                    warn!(project_id = %project_id, error = %err, "quota release failed to load project");
                    return;
                }
            };

            let released = match handle_release_quota(
                &project,
                ReleaseQuotaCommand {
                    request_id,
                    footprint: size.footprint(),
                    timestamp: Utc::now(),
                    correlation_id: ctx.correlation_id,
                    causation_id: None,
                },
            ) {
                Ok(event) => event,
                Err(err) => {
                    warn!(project_id = %project_id, error = %err, "quota release rejected");
                    return;
                }
            };

            match self
                .append_and_project(
                    project_id.as_uuid(),
                    vec![PlatformEvent::Project(ProjectEvent::QuotaReleased(
                        released,
                    ))],
                    project.version,
                )
                .await
            {
                Ok(_) => return,
                Err(ServiceError::ConcurrencyConflict { .. }) => continue,
                Err(err) => {
                    warn!(project_id = %project_id, error = %err, "quota release failed");
                    return;
                }
            }
        }

        warn!(project_id = %project_id, request_id = %request_id, "quota release retries exhausted");
    }

    async fn notify_approved(&self, state: &VmRequestState, rule: Option<String>) {
        let (Some(vm_name), Some(recipient)) =
            (state.vm_name.clone(), state.requester_email.clone())
        else {
            return;
        };

        if let Err(err) = self
            .notifier
            .send_approved(ApprovalNotice {
                request_id: state.id,
                vm_name,
                recipient,
                auto_approved_by_rule: rule,
            })
            .await
        {
            warn!(request_id = %state.id, error = %err, "approval notification failed");
        }
    }

    async fn notify_rejected(&self, state: &VmRequestState, reason: &str) {
        let (Some(vm_name), Some(recipient)) =
            (state.vm_name.clone(), state.requester_email.clone())
        else {
            return;
        };

        if let Err(err) = self
            .notifier
            .send_rejected(RejectionNotice {
                request_id: state.id,
                vm_name,
                recipient,
                reason: reason.to_string(),
            })
            .await
        {
            warn!(request_id = %state.id, error = %err, "rejection notification failed");
        }
    }
}
