// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform Domain Events
//!
//! This module defines all domain events for the VM request platform.
//! Events are immutable facts representing state changes that have occurred.
//!
//! # Event Sourcing Principles
//!
//! 1. **Events are immutable**: Once created, events never change
//! 2. **Events are past tense**: Named for what happened (Created, not Create)
//! 3. **Events include metadata**: correlation_id, causation_id, timestamp
//! 4. **Events are versioned**: event_version field for schema evolution
//! 5. **Events are facts**: Represent what happened, not commands
//!
//! # Event Flow
//!
//! ```text
//! Command → Aggregate → Event → EventStore → Projections
//!   (what to do)  (validate)  (what happened)  (persist)  (update views)
//! ```
//!
//! # Correlation and Causation
//!
//! - **correlation_id**: Groups related events across aggregates (the entire
//!   request flow, from submission through provisioning)
//! - **causation_id**: Direct parent event that caused this event (event chain)
//!
//! Example:
//! ```text
//! SubmitRequest
//!   correlation_id: req-123
//!   ↓
//! RequestCreated
//!   correlation_id: req-123
//!   causation_id: None (first event)
//!   event_id: evt-1
//!   ↓
//! RequestAutoApproved
//!   correlation_id: req-123
//!   causation_id: evt-1
//!   event_id: evt-2
//!   ↓
//! RequestProvisioningStarted
//!   correlation_id: req-123
//!   causation_id: evt-2
//!   event_id: evt-3
//! ```
//!
//! # Module Organization
//!
//! - [`platform`] - Top-level polymorphic event envelope
//! - [`vm_request`] - VmRequest aggregate events and the request status FSM
//! - [`vm`] - Vm aggregate events (provisioning sub-lifecycle)
//! - [`project`] - Project aggregate events (quota reservations)

pub mod platform;
pub mod project;
pub mod vm;
pub mod vm_request;

// Re-export commonly used types
pub use platform::PlatformEvent;
pub use project::{ProjectEvent, ProjectRegistered, QuotaReleased, QuotaReserved};
pub use vm::{VmEvent, VmProvisioned, VmProvisioningFailed, VmProvisioningStarted, VmStatus};
pub use vm_request::{
    RequestApproved, RequestAutoApproved, RequestCancelled, RequestCreated, RequestFailed,
    RequestProvisioningStarted, RequestReady, RequestRejected, RequestStatus, VmRequestEvent,
};
