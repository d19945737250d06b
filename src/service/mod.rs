// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for the VM Request Platform
//!
//! This module provides the application service layer that orchestrates
//! domain logic, event sourcing, and infrastructure concerns.
//!
//! # Architecture
//!
//! ```text
//! Client Request
//!     ↓
//! Service Layer (this module)
//!     ↓
//! Command Handler → Aggregate → Event
//!     ↓
//! Event Store (optimistic concurrency)
//!     ↓
//! Projections (read models)
//!     ↓
//! Notifications (best effort)
//! ```
//!
//! # Service Pattern
//!
//! Services coordinate between:
//! - **Command Handlers**: Pure domain logic
//! - **Event Store**: Persistence layer
//! - **Docket**: Policy evaluation on new requests
//! - **Provisioner**: Retrying hypervisor port
//! - **Query Side**: Read models and projections
//!
//! # Design Principles
//!
//! 1. **Transaction Boundaries**: Services define transaction scope
//! 2. **Command/Query Separation**: Separate write and read paths
//! 3. **Pure Domain Logic**: Services call pure functions
//! 4. **Time at the Boundary**: `Utc::now()` is sampled here, never in
//!    handlers
//! 5. **Async by Default**: All I/O is asynchronous

pub mod vm_request;

pub use vm_request::{
    CreateOutcome, NewVmRequest, ProvisioningReport, ServiceError, ServiceResult,
    VmRequestService,
};
