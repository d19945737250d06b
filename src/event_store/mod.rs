// Copyright (c) 2025 - Cowboy AI, Inc.
//! Event Store Abstraction
//!
//! This module defines the event storage interface and implementations for
//! persisting and retrieving domain events in event-sourced systems.
//!
//! # Architecture
//!
//! ```text
//! Command → Aggregate → Events → EventStore → Persistent Storage
//!                                    ↓
//!                              Projections
//! ```
//!
//! # Event Store Requirements
//!
//! 1. **Append-Only**: Events are never updated or deleted
//! 2. **Ordered**: Events maintain sequence within aggregate
//! 3. **Optimistic Concurrency**: Appends carry the expected stream version
//! 4. **Correlation**: Events track causation chains
//! 5. **Replay**: Support reconstructing state from events
//!
//! # Versioning Model
//!
//! A stream's version is its event count. A fresh stream has version 0;
//! appending N events to a stream at version V moves it to V + N. An append
//! whose `expected_version` does not equal the stream's current version is
//! rejected with [`EventStoreError::ConcurrencyConflict`] and writes nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::events::PlatformEvent;

pub mod memory;

pub use memory::MemoryEventStore;

/// Errors from event store operations
#[derive(Debug, Clone, Error)]
pub enum EventStoreError {
    /// The stream moved since the caller last read it
    #[error("concurrency conflict: expected version {expected}, actual {actual}")]
    ConcurrencyConflict { expected: u64, actual: u64 },

    /// Underlying storage failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Event could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for event store operations
pub type EventStoreResult<T> = Result<T, EventStoreError>;

/// Persisted event envelope.
///
/// Wraps a domain event with its position in the stream and the tracing
/// metadata the store guarantees for every persisted event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event ID (UUID v7 for time-ordering)
    pub event_id: Uuid,

    /// Aggregate ID this event belongs to
    pub aggregate_id: Uuid,

    /// Sequence number within the aggregate stream (1-based)
    pub sequence: u64,

    /// Event timestamp (when it occurred)
    pub timestamp: DateTime<Utc>,

    /// Correlation ID (tracks related events across aggregates)
    pub correlation_id: Uuid,

    /// Causation ID (immediate cause of this event)
    pub causation_id: Option<Uuid>,

    /// Event type name (diagnostics and filtering)
    pub event_type: String,

    /// The actual domain event
    pub data: PlatformEvent,
}

impl StoredEvent {
    /// Build the envelope for an event landing at `sequence`
    pub fn envelop(event: PlatformEvent, sequence: u64) -> Self {
        Self {
            event_id: event.event_id(),
            aggregate_id: event.aggregate_id(),
            sequence,
            timestamp: event.timestamp(),
            correlation_id: event.correlation_id(),
            causation_id: event.causation_id(),
            event_type: event.event_type_name().to_string(),
            data: event,
        }
    }
}

/// Event Store trait for persisting and retrieving domain events
///
/// This trait provides the core interface for event-sourced systems to
/// interact with persistent event storage. Implementations should ensure:
///
/// - **Atomicity**: Appending events succeeds or fails as a unit
/// - **Consistency**: Event ordering is maintained
/// - **Durability**: Events survive system failures
/// - **Replay**: Events can be read back in order
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append events to an aggregate's event stream
    ///
    /// Events are written atomically, either all succeed or all fail.
    /// `expected_version` is the stream version the caller observed; the
    /// append is rejected if the stream has moved.
    ///
    /// # Returns
    ///
    /// The new stream version after appending.
    ///
    /// # Errors
    ///
    /// - [`EventStoreError::ConcurrencyConflict`] if `expected_version`
    ///   does not match the current version
    /// - [`EventStoreError::Storage`] if writing fails
    async fn append(
        &self,
        aggregate_id: Uuid,
        events: Vec<PlatformEvent>,
        expected_version: u64,
    ) -> EventStoreResult<u64>;

    /// Read all events for an aggregate, in write order
    async fn read_events(&self, aggregate_id: Uuid) -> EventStoreResult<Vec<StoredEvent>>;

    /// Read events for an aggregate starting at a sequence number
    ///
    /// Useful for incremental projection catch-up.
    async fn read_events_from(
        &self,
        aggregate_id: Uuid,
        from_sequence: u64,
    ) -> EventStoreResult<Vec<StoredEvent>>;

    /// Read all events in a correlation chain
    ///
    /// Retrieves all events sharing a correlation_id across aggregates,
    /// ordered by timestamp. Useful for tracing an entire request flow.
    async fn read_by_correlation(
        &self,
        correlation_id: Uuid,
    ) -> EventStoreResult<Vec<StoredEvent>>;

    /// Current version of an aggregate stream
    ///
    /// Returns 0 for a stream with no events.
    async fn current_version(&self, aggregate_id: Uuid) -> EventStoreResult<u64>;
}
