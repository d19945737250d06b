// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-Memory Event Store
//!
//! Stream-per-aggregate storage behind a single `RwLock`. The compare-and-
//! append check and the write happen under one write-lock acquisition, which
//! is what makes the optimistic concurrency check race-free: two writers
//! appending at the same expected version serialize on the lock, and the
//! loser observes the moved version.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{EventStore, EventStoreError, EventStoreResult, StoredEvent};
use crate::events::PlatformEvent;

/// In-memory event store
///
/// The platform's primary store. Suitable for a single-process deployment;
/// a durable backend would implement the same [`EventStore`] contract.
#[derive(Default)]
pub struct MemoryEventStore {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(
        &self,
        aggregate_id: Uuid,
        events: Vec<PlatformEvent>,
        expected_version: u64,
    ) -> EventStoreResult<u64> {
        if events.is_empty() {
            return Err(EventStoreError::Storage(
                "cannot append an empty event batch".to_string(),
            ));
        }
        for event in &events {
            if event.aggregate_id() != aggregate_id {
                return Err(EventStoreError::Storage(format!(
                    "event {} belongs to aggregate {}, not {}",
                    event.event_type_name(),
                    event.aggregate_id(),
                    aggregate_id
                )));
            }
        }

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();

        let actual = stream.len() as u64;
        if actual != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let sequence = stream.len() as u64 + 1;
            stream.push(StoredEvent::envelop(event, sequence));
        }

        let new_version = stream.len() as u64;
        debug!(
            aggregate_id = %aggregate_id,
            version = new_version,
            "appended events"
        );
        Ok(new_version)
    }

    async fn read_events(&self, aggregate_id: Uuid) -> EventStoreResult<Vec<StoredEvent>> {
        let streams = self.streams.read().await;
        Ok(streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn read_events_from(
        &self,
        aggregate_id: Uuid,
        from_sequence: u64,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.sequence >= from_sequence)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_by_correlation(
        &self,
        correlation_id: Uuid,
    ) -> EventStoreResult<Vec<StoredEvent>> {
        let streams = self.streams.read().await;
        let mut matching: Vec<StoredEvent> = streams
            .values()
            .flatten()
            .filter(|e| e.correlation_id == correlation_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| (e.timestamp, e.event_id));
        Ok(matching)
    }

    async fn current_version(&self, aggregate_id: Uuid) -> EventStoreResult<u64> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(&aggregate_id)
            .map(|stream| stream.len() as u64)
            .unwrap_or(0))
    }
}
