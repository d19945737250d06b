// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform Domain Events
//!
//! Top-level event envelope for all platform events.
//! This allows polymorphic handling of different aggregate types while
//! maintaining type safety.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::ProjectEvent;
use super::vm::VmEvent;
use super::vm_request::VmRequestEvent;

/// Platform Domain Events
///
/// Polymorphic envelope for all platform aggregate events.
/// Each variant represents events from a specific aggregate type.
///
/// # Design Rationale
/// - The event store persists a single event type per stream slot
/// - Maintains type safety (each variant is strongly typed)
/// - Enables polymorphic projections over the whole platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "aggregate_type", content = "event", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Events from the VmRequest aggregate
    VmRequest(VmRequestEvent),

    /// Events from the Vm aggregate
    Vm(VmEvent),

    /// Events from the Project aggregate
    Project(ProjectEvent),
}

impl PlatformEvent {
    /// Extract aggregate ID from any event type
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            PlatformEvent::VmRequest(event) => event.aggregate_id().as_uuid(),
            PlatformEvent::Vm(event) => event.aggregate_id().as_uuid(),
            PlatformEvent::Project(event) => event.aggregate_id().as_uuid(),
        }
    }

    /// Extract event timestamp from any event type
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            PlatformEvent::VmRequest(event) => event.timestamp(),
            PlatformEvent::Vm(event) => event.timestamp(),
            PlatformEvent::Project(event) => event.timestamp(),
        }
    }

    /// Extract event ID from any event type
    pub fn event_id(&self) -> Uuid {
        match self {
            PlatformEvent::VmRequest(event) => event.event_id(),
            PlatformEvent::Vm(event) => event.event_id(),
            PlatformEvent::Project(event) => event.event_id(),
        }
    }

    /// Extract correlation ID from any event type
    pub fn correlation_id(&self) -> Uuid {
        match self {
            PlatformEvent::VmRequest(event) => event.correlation_id(),
            PlatformEvent::Vm(event) => event.correlation_id(),
            PlatformEvent::Project(event) => event.correlation_id(),
        }
    }

    /// Extract causation ID from any event type
    pub fn causation_id(&self) -> Option<Uuid> {
        match self {
            PlatformEvent::VmRequest(event) => event.causation_id(),
            PlatformEvent::Vm(event) => event.causation_id(),
            PlatformEvent::Project(event) => event.causation_id(),
        }
    }

    /// Extract event version from any event type
    pub fn event_version(&self) -> u32 {
        match self {
            PlatformEvent::VmRequest(event) => event.event_version(),
            PlatformEvent::Vm(event) => event.event_version(),
            PlatformEvent::Project(event) => event.event_version(),
        }
    }

    /// Get human-readable event type name
    pub fn event_type_name(&self) -> &str {
        match self {
            PlatformEvent::VmRequest(event) => event.event_type_name(),
            PlatformEvent::Vm(event) => event.event_type_name(),
            PlatformEvent::Project(event) => event.event_type_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProjectId, Reason, TenantId, UserId, VmName, VmRequestId, VmSize};
    use crate::events::vm_request::RequestCreated;

    fn sample_created() -> VmRequestEvent {
        VmRequestEvent::Created(RequestCreated {
            event_version: 1,
            event_id: Uuid::now_v7(),
            aggregate_id: VmRequestId::new(),
            timestamp: Utc::now(),
            correlation_id: Uuid::now_v7(),
            causation_id: None,
            tenant_id: TenantId::new(),
            project_id: ProjectId::new(),
            vm_name: VmName::new("build-agent-07").unwrap(),
            size: VmSize::S,
            justification: Reason::new("CI capacity for the release branch").unwrap(),
            requester_id: UserId::new(),
            requester_email: "dev@example.com".to_string(),
        })
    }

    #[test]
    fn test_platform_event_polymorphism() {
        let request_event = sample_created();
        let platform_event = PlatformEvent::VmRequest(request_event.clone());

        assert_eq!(
            platform_event.aggregate_id(),
            request_event.aggregate_id().as_uuid()
        );
        assert_eq!(
            platform_event.correlation_id(),
            request_event.correlation_id()
        );
        assert_eq!(platform_event.event_version(), 1);
        assert_eq!(platform_event.event_type_name(), "RequestCreated");
    }

    #[test]
    fn test_platform_event_serialization() {
        let platform_event = PlatformEvent::VmRequest(sample_created());

        let json = serde_json::to_string(&platform_event).expect("Failed to serialize");
        assert!(json.contains("vm_request")); // aggregate_type tag
        assert!(json.contains("build-agent-07"));

        let deserialized: PlatformEvent =
            serde_json::from_str(&json).expect("Failed to deserialize");

        match deserialized {
            PlatformEvent::VmRequest(VmRequestEvent::Created(e)) => {
                assert_eq!(e.vm_name.as_str(), "build-agent-07");
            }
            _ => panic!("Wrong event type after deserialization"),
        }
    }
}
