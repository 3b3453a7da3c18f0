//! Platform trait
//!
//! The seam between the descriptor types and a concrete transport. The REST
//! implementation talks to a remote workspace; the local implementation backs
//! tests and dry runs with the same surface.

use async_trait::async_trait;
use std::collections::BTreeMap;

use stratus_core::run::{RunId, RunRecord};
use stratus_core::sweep::SweepSpec;

use crate::artifacts::ArtifactEntry;
use crate::compute::{ComputePool, ComputeSpec};
use crate::error::Result;

/// Remote scheduler operations, scoped to one workspace
#[async_trait]
pub trait Platform: Send + Sync {
    /// Look up a compute pool by name
    async fn get_compute(&self, name: &str) -> Result<ComputePool>;

    /// Request creation of a compute pool
    async fn create_compute(&self, name: &str, spec: &ComputeSpec) -> Result<ComputePool>;

    /// Delete a compute pool
    async fn delete_compute(&self, name: &str) -> Result<()>;

    /// Submit a sweep, returning the parent run id
    async fn submit_sweep(&self, sweep: &SweepSpec) -> Result<RunId>;

    /// Fetch the current record of a run
    async fn get_run(&self, id: &RunId) -> Result<RunRecord>;

    /// Child runs of a sweep, in platform run order
    async fn list_children(&self, id: &RunId) -> Result<Vec<RunRecord>>;

    /// Scalar metrics aggregated for a run
    async fn get_metrics(&self, id: &RunId) -> Result<BTreeMap<String, f64>>;

    /// Cancel a run
    async fn cancel_run(&self, id: &RunId) -> Result<()>;

    /// Files recorded under the run's output directory
    async fn list_artifacts(&self, id: &RunId) -> Result<Vec<ArtifactEntry>>;

    /// Fetch the content of one artifact
    async fn fetch_artifact(&self, id: &RunId, path: &str) -> Result<Vec<u8>>;
}
