//! In-memory platform
//!
//! Backs tests and dry runs with the full [`Platform`] surface and no
//! network. Compute pools become ready after a configurable number of status
//! polls, and each poll of a sweep's parent run advances every child one
//! lifecycle step, so the blocking waits in `StratusClient` are exercised
//! for real.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use stratus_core::run::{RunId, RunRecord, RunStatus};
use stratus_core::sweep::SweepSpec;

use crate::artifacts::ArtifactEntry;
use crate::compute::{ComputePool, ComputeSpec, ComputeStatus};
use crate::error::{Error, Result};
use crate::platform::Platform;

struct PoolEntry {
    pool: ComputePool,
    polls_until_ready: u32,
}

#[derive(Default)]
struct LocalState {
    pools: HashMap<String, PoolEntry>,
    runs: HashMap<RunId, RunRecord>,
    children: HashMap<RunId, Vec<RunId>>,
    final_metrics: HashMap<RunId, BTreeMap<String, f64>>,
    artifacts: HashMap<RunId, Vec<(String, Vec<u8>)>>,
}

/// In-memory implementation of [`Platform`]
pub struct LocalPlatform {
    state: RwLock<LocalState>,
    readiness_polls: u32,
}

impl LocalPlatform {
    /// Platform whose pools become ready on the second status poll
    pub fn new() -> Self {
        Self::with_readiness_polls(2)
    }

    /// Platform whose pools become ready after `polls` status polls
    pub fn with_readiness_polls(polls: u32) -> Self {
        Self {
            state: RwLock::new(LocalState::default()),
            readiness_polls: polls,
        }
    }

    /// Deterministic final metrics for the i-th child
    ///
    /// The primary metric improves with the child index; the loss mirrors it
    /// downward. Tests rely on the ordering, not the exact values.
    fn child_metrics(sweep: &SweepSpec, index: usize) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            sweep.primary_metric.name.clone(),
            0.70 + 0.02 * index as f64,
        );
        metrics.insert("train_loss".to_string(), (0.60 - 0.02 * index as f64).max(0.05));
        metrics
    }

    fn child_artifacts(id: &RunId, metrics: &BTreeMap<String, f64>) -> Vec<(String, Vec<u8>)> {
        let metrics_json = serde_json::to_vec(metrics).unwrap_or_default();
        vec![
            (
                "outputs/model/final.bin".to_string(),
                format!("model weights for {}", id).into_bytes(),
            ),
            ("outputs/metrics.json".to_string(), metrics_json),
            (
                "logs/driver.log".to_string(),
                format!("driver log for {}", id).into_bytes(),
            ),
        ]
    }

    /// Advance every child of `parent` one lifecycle step
    fn step_sweep(state: &mut LocalState, parent: &RunId) {
        let Some(child_ids) = state.children.get(parent).cloned() else {
            return;
        };

        let mut all_terminal = true;
        for child_id in &child_ids {
            let Some(child) = state.runs.get_mut(child_id) else {
                continue;
            };

            child.status = match child.status {
                RunStatus::Queued => RunStatus::Preparing,
                RunStatus::Preparing => RunStatus::Running,
                RunStatus::Running => RunStatus::Completed,
                terminal => terminal,
            };

            if child.status == RunStatus::Completed && child.metrics.is_empty() {
                if let Some(metrics) = state.final_metrics.remove(child_id) {
                    child.metrics = metrics.clone();
                    state
                        .artifacts
                        .insert(child_id.clone(), Self::child_artifacts(child_id, &metrics));
                }
            }

            if !child.status.is_terminal() {
                all_terminal = false;
            }
        }

        if all_terminal {
            if let Some(record) = state.runs.get_mut(parent) {
                if !record.status.is_terminal() {
                    record.status = RunStatus::Completed;
                }
            }
        }
    }
}

impl Default for LocalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Platform for LocalPlatform {
    async fn get_compute(&self, name: &str) -> Result<ComputePool> {
        let mut state = self.state.write().await;
        let entry = state
            .pools
            .get_mut(name)
            .ok_or_else(|| Error::compute_not_found(name))?;

        if entry.polls_until_ready > 0 {
            entry.polls_until_ready -= 1;
            if entry.polls_until_ready == 0 {
                entry.pool.status = ComputeStatus::Ready;
                entry.pool.current_nodes = entry.pool.spec.min_nodes;
            }
        }

        Ok(entry.pool.clone())
    }

    async fn create_compute(&self, name: &str, spec: &ComputeSpec) -> Result<ComputePool> {
        spec.validate()?;

        let mut state = self.state.write().await;
        if state.pools.contains_key(name) {
            return Err(Error::Api {
                status: 409,
                message: format!("compute pool '{}' already exists", name),
            });
        }

        let pool = ComputePool::new(name, spec.clone());
        state.pools.insert(
            name.to_string(),
            PoolEntry {
                pool: pool.clone(),
                polls_until_ready: self.readiness_polls,
            },
        );

        Ok(pool)
    }

    async fn delete_compute(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .pools
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::compute_not_found(name))
    }

    async fn submit_sweep(&self, sweep: &SweepSpec) -> Result<RunId> {
        sweep.validate()?;

        let mut state = self.state.write().await;

        if !state.pools.contains_key(sweep.job.compute_target()) {
            return Err(Error::compute_not_found(sweep.job.compute_target()));
        }

        let parent_id = RunId::new(Uuid::new_v4().to_string());
        let mut parent = RunRecord::new(parent_id.clone());
        parent.status = RunStatus::Running;

        let points = sweep.parameter_space.grid_points();
        let planned = sweep.planned_runs() as usize;

        let mut child_ids = Vec::with_capacity(planned);
        for (index, assignment) in points.into_iter().take(planned).enumerate() {
            let child_id = RunId::new(format!("{}_{}", parent_id, index));
            let mut child = RunRecord::new(child_id.clone());
            child.parent = Some(parent_id.clone());
            child.hyperparameters = assignment;

            state
                .final_metrics
                .insert(child_id.clone(), Self::child_metrics(sweep, index));
            state.runs.insert(child_id.clone(), child);
            child_ids.push(child_id);
        }

        state.children.insert(parent_id.clone(), child_ids);
        state.runs.insert(parent_id.clone(), parent);

        Ok(parent_id)
    }

    async fn get_run(&self, id: &RunId) -> Result<RunRecord> {
        let mut state = self.state.write().await;

        if state.children.contains_key(id) {
            Self::step_sweep(&mut state, id);
        }

        state
            .runs
            .get(id)
            .cloned()
            .ok_or_else(|| Error::run_not_found(id.as_str()))
    }

    async fn list_children(&self, id: &RunId) -> Result<Vec<RunRecord>> {
        let state = self.state.read().await;
        let child_ids = state
            .children
            .get(id)
            .ok_or_else(|| Error::run_not_found(id.as_str()))?;

        Ok(child_ids
            .iter()
            .filter_map(|child_id| state.runs.get(child_id).cloned())
            .collect())
    }

    async fn get_metrics(&self, id: &RunId) -> Result<BTreeMap<String, f64>> {
        let state = self.state.read().await;
        state
            .runs
            .get(id)
            .map(|record| record.metrics.clone())
            .ok_or_else(|| Error::run_not_found(id.as_str()))
    }

    async fn cancel_run(&self, id: &RunId) -> Result<()> {
        let mut state = self.state.write().await;

        if !state.runs.contains_key(id) {
            return Err(Error::run_not_found(id.as_str()));
        }

        let mut targets = vec![id.clone()];
        if let Some(child_ids) = state.children.get(id) {
            targets.extend(child_ids.iter().cloned());
        }

        for target in targets {
            if let Some(record) = state.runs.get_mut(&target) {
                if !record.status.is_terminal() {
                    record.status = RunStatus::Canceled;
                }
            }
        }

        Ok(())
    }

    async fn list_artifacts(&self, id: &RunId) -> Result<Vec<ArtifactEntry>> {
        let state = self.state.read().await;

        if !state.runs.contains_key(id) {
            return Err(Error::run_not_found(id.as_str()));
        }

        Ok(state
            .artifacts
            .get(id)
            .map(|files| {
                files
                    .iter()
                    .map(|(path, content)| ArtifactEntry::new(path, content.len() as u64))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_artifact(&self, id: &RunId, path: &str) -> Result<Vec<u8>> {
        let state = self.state.read().await;
        state
            .artifacts
            .get(id)
            .and_then(|files| {
                files
                    .iter()
                    .find(|(file_path, _)| file_path == path)
                    .map(|(_, content)| content.clone())
            })
            .ok_or_else(|| Error::ArtifactNotFound {
                run_id: id.to_string(),
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::job::JobSpec;
    use stratus_core::sweep::PrimaryMetric;

    fn sample_sweep() -> SweepSpec {
        let job = JobSpec::new("train.py")
            .with_compute_target("gpu-pool")
            .with_gpu(true);

        SweepSpec::new(job, PrimaryMetric::maximize("eval_accuracy"))
            .with_choice("learning_rate", vec![3e-5.into(), 5e-5.into()])
            .with_max_total_runs(2)
            .with_max_concurrent_runs(2)
    }

    async fn platform_with_pool() -> LocalPlatform {
        let platform = LocalPlatform::with_readiness_polls(1);
        platform
            .create_compute("gpu-pool", &ComputeSpec::new("gpu-4x", 0, 4))
            .await
            .unwrap();
        platform
    }

    #[tokio::test]
    async fn test_compute_becomes_ready_after_polls() {
        let platform = LocalPlatform::with_readiness_polls(2);
        platform
            .create_compute("gpu-pool", &ComputeSpec::new("gpu-4x", 1, 4))
            .await
            .unwrap();

        let pool = platform.get_compute("gpu-pool").await.unwrap();
        assert_eq!(pool.status, ComputeStatus::Creating);

        let pool = platform.get_compute("gpu-pool").await.unwrap();
        assert_eq!(pool.status, ComputeStatus::Ready);
        assert_eq!(pool.current_nodes, 1);
    }

    #[tokio::test]
    async fn test_duplicate_compute_rejected() {
        let platform = platform_with_pool().await;
        let result = platform
            .create_compute("gpu-pool", &ComputeSpec::new("gpu-4x", 0, 4))
            .await;
        assert!(matches!(result, Err(Error::Api { status: 409, .. })));
    }

    #[tokio::test]
    async fn test_delete_compute() {
        let platform = platform_with_pool().await;
        platform.delete_compute("gpu-pool").await.unwrap();
        assert!(matches!(
            platform.get_compute("gpu-pool").await,
            Err(Error::ComputeNotFound(_))
        ));
        assert!(matches!(
            platform.delete_compute("gpu-pool").await,
            Err(Error::ComputeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_requires_compute() {
        let platform = LocalPlatform::new();
        let result = platform.submit_sweep(&sample_sweep()).await;
        assert!(matches!(result, Err(Error::ComputeNotFound(_))));
    }

    #[tokio::test]
    async fn test_sweep_steps_to_completion() {
        let platform = platform_with_pool().await;
        let parent_id = platform.submit_sweep(&sample_sweep()).await.unwrap();

        let children = platform.list_children(&parent_id).await.unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.iter().all(|c| c.status == RunStatus::Queued));
        assert_eq!(children[0].parent.as_ref(), Some(&parent_id));

        // each parent poll advances children one step: queued -> preparing
        // -> running -> completed
        for _ in 0..3 {
            platform.get_run(&parent_id).await.unwrap();
        }

        let parent = platform.get_run(&parent_id).await.unwrap();
        assert_eq!(parent.status, RunStatus::Completed);

        let children = platform.list_children(&parent_id).await.unwrap();
        assert!(children.iter().all(|c| c.status == RunStatus::Completed));
        assert!(children[1].metric("eval_accuracy").unwrap() > children[0].metric("eval_accuracy").unwrap());
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_children() {
        let platform = platform_with_pool().await;
        let parent_id = platform.submit_sweep(&sample_sweep()).await.unwrap();

        platform.cancel_run(&parent_id).await.unwrap();

        let parent = platform.get_run(&parent_id).await.unwrap();
        assert_eq!(parent.status, RunStatus::Canceled);

        let children = platform.list_children(&parent_id).await.unwrap();
        assert!(children.iter().all(|c| c.status == RunStatus::Canceled));
    }

    #[tokio::test]
    async fn test_artifacts_registered_on_completion() {
        let platform = platform_with_pool().await;
        let parent_id = platform.submit_sweep(&sample_sweep()).await.unwrap();

        for _ in 0..3 {
            platform.get_run(&parent_id).await.unwrap();
        }

        let children = platform.list_children(&parent_id).await.unwrap();
        let child_id = &children[0].id;

        let artifacts = platform.list_artifacts(child_id).await.unwrap();
        let paths: Vec<&str> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert!(paths.contains(&"outputs/model/final.bin"));
        assert!(paths.contains(&"outputs/metrics.json"));
        assert!(paths.contains(&"logs/driver.log"));

        let content = platform
            .fetch_artifact(child_id, "outputs/model/final.bin")
            .await
            .unwrap();
        assert!(!content.is_empty());

        assert!(matches!(
            platform.fetch_artifact(child_id, "outputs/absent.bin").await,
            Err(Error::ArtifactNotFound { .. })
        ));
    }
}
