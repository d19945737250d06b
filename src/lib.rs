// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event-sourced VM request, approval, and provisioning engine
//!
//! This crate provides the core of a multi-tenant VM request platform:
//! - Append-only event store with optimistic concurrency
//! - Pure functional aggregates reconstructed by folding events
//! - Docket policy engine for automated approval decisions
//! - Quota accounting folded from reservation events
//! - Resilient hypervisor provisioning with bounded retries
//! - Idempotent read-model projections
//!
//! # Architecture
//!
//! ```text
//! RequestContext + Command
//!         ↓
//! VmRequestService ── Docket ── quota (Project stream)
//!         ↓
//! Command Handlers (pure) → Events → EventStore
//!         ↓                              ↓
//! ResilientProvisioner            Projections
//! ```
//!
//! All writes go through the event store; read models are derived and
//! rebuildable. The quota gate never consults a projection.

pub mod aggregate;
pub mod context;
pub mod docket;
pub mod domain;
pub mod event_store;
pub mod events;
pub mod notify;
pub mod projections;
pub mod provisioning;
pub mod service;
pub mod state_machine;

// Re-export commonly used types
pub use context::{ContextError, RequestContext};
pub use docket::{Decision, DocketEngine, PolicyRule, RequestSnapshot};
pub use event_store::{EventStore, EventStoreError, MemoryEventStore, StoredEvent};
pub use events::PlatformEvent;
pub use service::{
    CreateOutcome, NewVmRequest, ProvisioningReport, ServiceError, VmRequestService,
};
