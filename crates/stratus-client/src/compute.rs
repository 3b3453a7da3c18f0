//! Compute pool types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Requested shape of a compute pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeSpec {
    /// VM SKU (e.g. a 4-GPU NC-series size)
    pub vm_size: String,

    /// Nodes kept warm when idle
    pub min_nodes: u32,

    /// Upper bound the pool scales out to
    pub max_nodes: u32,

    /// Idle seconds before a node is released back to `min_nodes`
    #[serde(default = "default_scaledown")]
    pub idle_seconds_before_scaledown: u64,
}

fn default_scaledown() -> u64 {
    120
}

impl ComputeSpec {
    /// Spec for a pool of one VM size, scaling between the node bounds
    pub fn new(vm_size: impl Into<String>, min_nodes: u32, max_nodes: u32) -> Self {
        Self {
            vm_size: vm_size.into(),
            min_nodes,
            max_nodes,
            idle_seconds_before_scaledown: default_scaledown(),
        }
    }

    /// Set the idle scale-down delay
    pub fn with_idle_scaledown(mut self, seconds: u64) -> Self {
        self.idle_seconds_before_scaledown = seconds;
        self
    }

    /// Validates the spec
    pub fn validate(&self) -> Result<()> {
        if self.vm_size.trim().is_empty() {
            return Err(Error::InvalidCompute("vm_size must not be empty".into()));
        }
        if self.max_nodes == 0 {
            return Err(Error::InvalidCompute("max_nodes must be at least 1".into()));
        }
        if self.min_nodes > self.max_nodes {
            return Err(Error::InvalidCompute(
                "min_nodes must not exceed max_nodes".into(),
            ));
        }
        Ok(())
    }
}

/// Compute pool lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeStatus {
    /// Pool is being provisioned
    Creating,
    /// Pool accepts jobs
    Ready,
    /// Pool is scaling between node bounds
    Resizing,
    /// Pool is being torn down
    Deleting,
    /// Provisioning failed
    Failed,
}

impl ComputeStatus {
    /// Whether jobs can be placed on the pool
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Whether the pool will never become ready
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Deleting | Self::Failed)
    }
}

impl std::fmt::Display for ComputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Creating => "creating",
            Self::Ready => "ready",
            Self::Resizing => "resizing",
            Self::Deleting => "deleting",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// A compute pool as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputePool {
    /// Pool name, unique within the workspace
    pub name: String,

    /// Requested shape
    pub spec: ComputeSpec,

    /// Current lifecycle state
    pub status: ComputeStatus,

    /// Nodes currently allocated
    pub current_nodes: u32,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ComputePool {
    /// A freshly requested pool
    pub fn new(name: impl Into<String>, spec: ComputeSpec) -> Self {
        Self {
            name: name.into(),
            spec,
            status: ComputeStatus::Creating,
            current_nodes: 0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_spec_validation() {
        assert!(ComputeSpec::new("gpu-4x", 0, 8).validate().is_ok());
        assert!(ComputeSpec::new("", 0, 8).validate().is_err());
        assert!(ComputeSpec::new("gpu-4x", 0, 0).validate().is_err());
        assert!(ComputeSpec::new("gpu-4x", 9, 8).validate().is_err());
    }

    #[test]
    fn test_compute_status_predicates() {
        assert!(ComputeStatus::Ready.is_ready());
        assert!(!ComputeStatus::Resizing.is_ready());
        assert!(!ComputeStatus::Resizing.is_terminal());
        assert!(ComputeStatus::Failed.is_terminal());
        assert!(ComputeStatus::Deleting.is_terminal());
    }

    #[test]
    fn test_compute_pool_starts_creating() {
        let pool = ComputePool::new("gpu-pool", ComputeSpec::new("gpu-4x", 0, 4));
        assert_eq!(pool.status, ComputeStatus::Creating);
        assert_eq!(pool.current_nodes, 0);
    }
}
