// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Functional Aggregates
//!
//! This module provides the functional aggregate pattern for event sourcing:
//! - Aggregates are pure functions: State → Command → Result<Event, Error>
//! - State reconstruction via event folding: [Event] → State
//! - No mutations, no side effects
//! - All state changes represented as events
//!
//! # Event Sourcing Pattern
//!
//! ```text
//! Command → Aggregate → Events → Event Store
//!    ↓          ↓          ↓
//! Intent   Validation  Facts
//! ```
//!
//! # Fold Pattern
//!
//! State is reconstructed by folding events:
//!
//! ```rust,ignore
//! let initial = VmRequestState::default_for(request_id);
//! let state = events.iter().fold(initial, |state, event| {
//!     apply_event(state, event)
//! });
//! ```
//!
//! # Aggregates
//!
//! - [`vm_request`] - the approval lifecycle of a VM request
//! - [`vm`] - the hypervisor-side provisioning sub-lifecycle
//! - [`project`] - quota limits and reservations
//!
//! # Design Principles
//!
//! ## 1. Command-Event Separation
//! - Commands express intent (what should happen)
//! - Events express facts (what did happen)
//! - Commands can fail, events cannot
//!
//! ## 2. Pure Event Application
//! - `apply_event(State, Event) → State`
//! - No validation in event application (already happened)
//! - Deterministic reconstruction from events
//!
//! ## 3. Command Handlers
//! - `handle_command(State, Command) → Result<Event, Error>`
//! - All validation happens here
//! - Business rules enforced
//! - Pure functions (no side effects)
//!
//! ## 4. Time as Parameter
//! - Never call `Utc::now()` in domain logic
//! - Timestamp passed explicitly in commands
//! - Enables deterministic testing
//!
//! # References
//!
//! - Greg Young: Event Sourcing
//! - Functional Event Sourcing Decider Pattern

pub mod commands;
pub mod handlers;
pub mod project;
pub mod vm;
pub mod vm_request;

pub use commands::*;
pub use handlers::*;
pub use project::ProjectState;
pub use vm::VmState;
pub use vm_request::VmRequestState;
