// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed Identifiers
//!
//! UUID-backed opaque identifiers for the aggregates and actors in the
//! platform. Each id is a distinct type so a `ProjectId` can never be passed
//! where a `VmRequestId` is expected. Ids use UUID v7 for time-ordering.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh time-ordered identifier
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// The underlying UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

uuid_id!(
    /// Identifier of a VmRequest aggregate (the approval-side stream)
    VmRequestId
);

uuid_id!(
    /// Identifier of a Vm aggregate (the provisioning-side stream)
    VmId
);

uuid_id!(
    /// Identifier of a Project aggregate (the quota-holding stream)
    ProjectId
);

uuid_id!(
    /// Tenant identifier supplied by the identity provider
    TenantId
);

uuid_id!(
    /// User identifier supplied by the identity provider
    UserId
);
