//! High-level client operations
//!
//! `StratusClient` drives the blocking parts of the workflow: get-or-create
//! compute, wait loops, sweep submission, and artifact download. It is generic
//! over the [`Platform`] transport.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use stratus_core::run::{select_best, RunId, RunRecord};
use stratus_core::sweep::SweepSpec;

use crate::artifacts::ArtifactEntry;
use crate::compute::{ComputePool, ComputeSpec};
use crate::error::{Error, Result};
use crate::platform::Platform;

/// Default seconds between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Client over a platform transport
#[derive(Clone)]
pub struct StratusClient {
    platform: Arc<dyn Platform>,
    poll_interval: Duration,
}

impl StratusClient {
    /// Create a client over a transport
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self {
            platform,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The underlying transport
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    // ========== Compute ==========

    /// Look up a compute pool, creating it if absent
    pub async fn ensure_compute(&self, name: &str, spec: &ComputeSpec) -> Result<ComputePool> {
        spec.validate()?;

        match self.platform.get_compute(name).await {
            Ok(pool) => {
                info!(compute = name, status = %pool.status, "Reusing existing compute pool");
                Ok(pool)
            }
            Err(Error::ComputeNotFound(_)) => {
                info!(compute = name, vm_size = %spec.vm_size, "Creating compute pool");
                self.platform.create_compute(name, spec).await
            }
            Err(err) => Err(err),
        }
    }

    /// Block until a compute pool is ready
    ///
    /// `Resizing` counts as not-ready and polling continues; `Failed` aborts
    /// immediately.
    pub async fn wait_for_compute(&self, name: &str, timeout: Duration) -> Result<ComputePool> {
        let deadline = Instant::now() + timeout;
        let mut last_status = None;

        loop {
            let pool = self.platform.get_compute(name).await?;

            if last_status != Some(pool.status) {
                info!(compute = name, status = %pool.status, "Compute pool status");
                last_status = Some(pool.status);
            }

            if pool.status.is_ready() {
                return Ok(pool);
            }
            if pool.status.is_terminal() {
                return Err(Error::ComputeFailed(format!(
                    "pool '{}' entered state '{}'",
                    name, pool.status
                )));
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(format!("compute pool '{}'", name)));
            }

            debug!(compute = name, "Compute pool not ready, polling again");
            sleep(self.poll_interval).await;
        }
    }

    /// Delete a compute pool
    pub async fn delete_compute(&self, name: &str) -> Result<()> {
        info!(compute = name, "Deleting compute pool");
        self.platform.delete_compute(name).await
    }

    // ========== Sweeps ==========

    /// Submit a sweep and return a handle to the parent run
    pub async fn submit(&self, sweep: &SweepSpec) -> Result<SweepHandle> {
        sweep.validate()?;

        let id = self.platform.submit_sweep(sweep).await?;
        info!(run = %id, planned_runs = sweep.planned_runs(), "Sweep submitted");

        Ok(SweepHandle {
            id,
            sweep: sweep.clone(),
            client: self.clone(),
        })
    }

    /// Fetch the current record of any run
    pub async fn run(&self, id: &RunId) -> Result<RunRecord> {
        self.platform.get_run(id).await
    }

    /// Scalar metrics of any run
    pub async fn metrics(&self, id: &RunId) -> Result<BTreeMap<String, f64>> {
        self.platform.get_metrics(id).await
    }

    /// Cancel a run
    pub async fn cancel(&self, id: &RunId) -> Result<()> {
        warn!(run = %id, "Cancelling run");
        self.platform.cancel_run(id).await
    }

    // ========== Artifacts ==========

    /// Files recorded on a run
    pub async fn list_artifacts(&self, id: &RunId) -> Result<Vec<ArtifactEntry>> {
        self.platform.list_artifacts(id).await
    }

    /// Download one artifact to a local file
    pub async fn download_artifact(
        &self,
        id: &RunId,
        artifact_path: &str,
        dest: impl AsRef<Path>,
    ) -> Result<()> {
        let dest = dest.as_ref();
        let content = self.platform.fetch_artifact(id, artifact_path).await?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(dest, content).await?;

        debug!(run = %id, artifact = artifact_path, dest = %dest.display(), "Artifact downloaded");
        Ok(())
    }

    /// Download every output-directory file of a run, preserving layout
    ///
    /// Returns the local paths written.
    pub async fn download_outputs(
        &self,
        id: &RunId,
        dest_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let dest_dir = dest_dir.as_ref();
        let entries = self.platform.list_artifacts(id).await?;

        let mut written = Vec::new();
        for entry in entries.iter().filter(|e| e.is_output()) {
            let dest = dest_dir.join(entry.relative_output_path());
            self.download_artifact(id, &entry.path, &dest).await?;
            written.push(dest);
        }

        info!(run = %id, files = written.len(), dest = %dest_dir.display(), "Outputs downloaded");
        Ok(written)
    }
}

/// Handle to a submitted sweep
#[derive(Clone)]
pub struct SweepHandle {
    id: RunId,
    sweep: SweepSpec,
    client: StratusClient,
}

impl SweepHandle {
    /// Parent run id
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// The sweep this handle was created from
    pub fn sweep(&self) -> &SweepSpec {
        &self.sweep
    }

    /// Current record of the parent run
    pub async fn status(&self) -> Result<RunRecord> {
        self.client.platform.get_run(&self.id).await
    }

    /// Block until the sweep reaches a terminal state
    pub async fn wait(&self, timeout: Duration) -> Result<RunRecord> {
        let deadline = Instant::now() + timeout;
        let mut last_status = None;

        loop {
            let record = self.client.platform.get_run(&self.id).await?;

            if last_status != Some(record.status) {
                info!(run = %self.id, status = %record.status, "Sweep status");
                last_status = Some(record.status);
            }

            if record.status.is_terminal() {
                return Ok(record);
            }
            if Instant::now() >= deadline {
                return Err(Error::timeout(format!("sweep run '{}'", self.id)));
            }

            sleep(self.client.poll_interval).await;
        }
    }

    /// Child runs in platform order
    pub async fn children(&self) -> Result<Vec<RunRecord>> {
        self.client.platform.list_children(&self.id).await
    }

    /// Best completed child by the sweep's primary metric
    pub async fn best_run(&self) -> Result<RunRecord> {
        let children = self.children().await?;
        let best = select_best(&children, &self.sweep.primary_metric)?;
        Ok(best.clone())
    }

    /// Cancel the sweep
    pub async fn cancel(&self) -> Result<()> {
        self.client.cancel(&self.id).await
    }
}
