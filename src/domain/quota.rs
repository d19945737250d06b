// Copyright (c) 2025 - Cowboy AI, Inc.
//! Project Classification and Quota Limits
//!
//! A project is the quota-holding boundary: every approved request reserves
//! its size footprint against the project's limits. Usage is always computed
//! by folding the project's own event stream, never from a read model.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::vm_size::ResourceFootprint;

/// Project classification, used by policy rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Development,
    Production,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectType::Development => write!(f, "development"),
            ProjectType::Production => write!(f, "production"),
        }
    }
}

/// Numeric quota limits for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Maximum number of concurrently reserved VMs
    pub max_vms: u32,

    /// Aggregate resource ceiling
    pub resources: ResourceFootprint,
}

impl QuotaLimits {
    /// Default limits for a development project
    pub fn development() -> Self {
        Self {
            max_vms: 10,
            resources: ResourceFootprint {
                cpu: 24,
                ram_gb: 48,
                disk_gb: 600,
            },
        }
    }

    /// Default limits for a production project
    pub fn production() -> Self {
        Self {
            max_vms: 25,
            resources: ResourceFootprint {
                cpu: 96,
                ram_gb: 192,
                disk_gb: 2500,
            },
        }
    }
}

/// Current quota consumption, folded from reservation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuotaUsage {
    /// Number of active reservations
    pub vm_count: u32,

    /// Accumulated resource footprint
    pub resources: ResourceFootprint,
}

impl QuotaUsage {
    /// Usage after adding one reservation
    pub fn reserve(&self, footprint: &ResourceFootprint) -> QuotaUsage {
        QuotaUsage {
            vm_count: self.vm_count + 1,
            resources: self.resources.plus(footprint),
        }
    }

    /// Usage after releasing one reservation
    pub fn release(&self, footprint: &ResourceFootprint) -> QuotaUsage {
        QuotaUsage {
            vm_count: self.vm_count.saturating_sub(1),
            resources: self.resources.minus(footprint),
        }
    }

    /// Would adding `footprint` overflow the given limits?
    pub fn would_exceed(&self, limits: &QuotaLimits, footprint: &ResourceFootprint) -> bool {
        let after = self.reserve(footprint);
        after.vm_count > limits.max_vms || after.resources.exceeds(&limits.resources)
    }
}
