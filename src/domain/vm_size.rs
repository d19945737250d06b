// Copyright (c) 2025 - Cowboy AI, Inc.
//! VM Size Catalogue
//!
//! Requests pick from a fixed T-shirt sizing; each size maps to a fixed
//! cpu/ram/disk footprint. The footprint is what counts against project
//! quota, so it lives here rather than on the hypervisor side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Available VM sizes, ordered smallest to largest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum VmSize {
    /// 2 vCPU / 4 GB RAM / 50 GB disk
    S,
    /// 4 vCPU / 8 GB RAM / 100 GB disk
    M,
    /// 8 vCPU / 16 GB RAM / 250 GB disk
    L,
}

/// Resource footprint of a size (or of accumulated usage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceFootprint {
    pub cpu: u32,
    pub ram_gb: u32,
    pub disk_gb: u32,
}

impl ResourceFootprint {
    /// Component-wise sum
    pub fn plus(&self, other: &ResourceFootprint) -> ResourceFootprint {
        ResourceFootprint {
            cpu: self.cpu + other.cpu,
            ram_gb: self.ram_gb + other.ram_gb,
            disk_gb: self.disk_gb + other.disk_gb,
        }
    }

    /// Component-wise saturating difference
    pub fn minus(&self, other: &ResourceFootprint) -> ResourceFootprint {
        ResourceFootprint {
            cpu: self.cpu.saturating_sub(other.cpu),
            ram_gb: self.ram_gb.saturating_sub(other.ram_gb),
            disk_gb: self.disk_gb.saturating_sub(other.disk_gb),
        }
    }

    /// True when any component exceeds the given limits
    pub fn exceeds(&self, limits: &ResourceFootprint) -> bool {
        self.cpu > limits.cpu || self.ram_gb > limits.ram_gb || self.disk_gb > limits.disk_gb
    }
}

impl VmSize {
    /// Number of virtual CPUs
    pub fn cpu(&self) -> u32 {
        match self {
            VmSize::S => 2,
            VmSize::M => 4,
            VmSize::L => 8,
        }
    }

    /// RAM in gigabytes
    pub fn ram_gb(&self) -> u32 {
        match self {
            VmSize::S => 4,
            VmSize::M => 8,
            VmSize::L => 16,
        }
    }

    /// Disk in gigabytes
    pub fn disk_gb(&self) -> u32 {
        match self {
            VmSize::S => 50,
            VmSize::M => 100,
            VmSize::L => 250,
        }
    }

    /// Quota footprint of this size
    pub fn footprint(&self) -> ResourceFootprint {
        ResourceFootprint {
            cpu: self.cpu(),
            ram_gb: self.ram_gb(),
            disk_gb: self.disk_gb(),
        }
    }
}

impl fmt::Display for VmSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmSize::S => write!(f, "S"),
            VmSize::M => write!(f, "M"),
            VmSize::L => write!(f, "L"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_are_ordered() {
        assert!(VmSize::S < VmSize::M);
        assert!(VmSize::M < VmSize::L);
    }

    #[test]
    fn test_footprints_grow_with_size() {
        let s = VmSize::S.footprint();
        let m = VmSize::M.footprint();
        let l = VmSize::L.footprint();

        assert!(s.cpu < m.cpu && m.cpu < l.cpu);
        assert!(s.ram_gb < m.ram_gb && m.ram_gb < l.ram_gb);
        assert!(s.disk_gb < m.disk_gb && m.disk_gb < l.disk_gb);
    }

    #[test]
    fn test_footprint_arithmetic() {
        let a = VmSize::S.footprint();
        let b = VmSize::M.footprint();

        let sum = a.plus(&b);
        assert_eq!(sum.cpu, 6);
        assert_eq!(sum.ram_gb, 12);
        assert_eq!(sum.disk_gb, 150);

        assert_eq!(sum.minus(&b), a);
    }

    #[test]
    fn test_exceeds() {
        let limits = ResourceFootprint {
            cpu: 4,
            ram_gb: 8,
            disk_gb: 100,
        };

        assert!(!VmSize::S.footprint().exceeds(&limits));
        assert!(!VmSize::M.footprint().exceeds(&limits));
        assert!(VmSize::L.footprint().exceeds(&limits));
    }

    #[test]
    fn test_size_serialization() {
        let json = serde_json::to_string(&VmSize::S).expect("Failed to serialize");
        assert_eq!(json, "\"S\"");

        let back: VmSize = serde_json::from_str("\"L\"").expect("Failed to deserialize");
        assert_eq!(back, VmSize::L);
    }
}
