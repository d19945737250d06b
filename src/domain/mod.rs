// Copyright (c) 2025 - Cowboy AI, Inc.
//! Platform Domain Models
//!
//! Validated value types shared by the aggregates: typed identifiers, the VM
//! size catalogue, name and reason validation, and quota arithmetic.
//!
//! # Value Objects with Invariants
//!
//! - [`VmName`] - guest-hostname-safe machine names (RFC 1123 label rules)
//! - [`Reason`] - free-text justifications/reasons, length 10..=500
//! - [`VmSize`] - fixed S/M/L catalogue with cpu/ram/disk footprints
//! - [`QuotaLimits`] / [`QuotaUsage`] - numeric quota arithmetic
//!
//! All types here are immutable once constructed; invalid values cannot
//! exist. Identifiers are UUID v7 newtypes so streams and actors cannot be
//! confused at compile time.

pub mod ids;
pub mod quota;
pub mod reason;
pub mod vm_name;
pub mod vm_size;

// Re-export value objects
pub use ids::{ProjectId, TenantId, UserId, VmId, VmRequestId};
pub use quota::{ProjectType, QuotaLimits, QuotaUsage};
pub use reason::{Reason, ReasonError};
pub use vm_name::{VmName, VmNameError};
pub use vm_size::{ResourceFootprint, VmSize};
