//! Run records and best-run selection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::sweep::{Assignment, MetricGoal, PrimaryMetric};

/// Unique run identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Create from string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Run execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted by the scheduler, not yet placed
    Queued,
    /// Environment is being materialized on the compute pool
    Preparing,
    /// Entry script is executing
    Running,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
    /// Canceled before completion
    Canceled,
}

impl RunStatus {
    /// Check if the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "queued",
            Self::Preparing => "preparing",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        write!(f, "{}", s)
    }
}

/// A run as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier
    pub id: RunId,

    /// Parent sweep run, if this is a child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RunId>,

    /// Hyperparameters this run executed with
    #[serde(default)]
    pub hyperparameters: Assignment,

    /// Current status
    pub status: RunStatus,

    /// Scalar metrics aggregated by the platform
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,

    /// Submission timestamp
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    /// Create a fresh queued record
    pub fn new(id: RunId) -> Self {
        Self {
            id,
            parent: None,
            hyperparameters: Assignment::new(),
            status: RunStatus::Queued,
            metrics: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Value of a named metric, if recorded
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Select the best run by the primary metric
///
/// Only completed children that recorded the metric participate; a NaN value
/// counts as not recorded. Ties keep the earlier run in platform order.
pub fn select_best<'a>(
    children: &'a [RunRecord],
    metric: &PrimaryMetric,
) -> Result<&'a RunRecord> {
    let mut best: Option<(&RunRecord, f64)> = None;

    for run in children {
        if run.status != RunStatus::Completed {
            continue;
        }
        let Some(value) = run.metric(&metric.name) else {
            continue;
        };
        if value.is_nan() {
            continue;
        }

        let better = match best {
            None => true,
            Some((_, current)) => match metric.goal {
                MetricGoal::Minimize => value < current,
                MetricGoal::Maximize => value > current,
            },
        };
        if better {
            best = Some((run, value));
        }
    }

    best.map(|(run, _)| run)
        .ok_or_else(|| Error::NoCompletedRuns(metric.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str, status: RunStatus, accuracy: Option<f64>) -> RunRecord {
        let mut record = RunRecord::new(RunId::new(id));
        record.status = status;
        if let Some(value) = accuracy {
            record.metrics.insert("eval_accuracy".to_string(), value);
        }
        record
    }

    #[test]
    fn test_run_status_terminal() {
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(RunStatus::Canceled.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Queued.is_terminal());
    }

    #[test]
    fn test_select_best_maximize() {
        let children = vec![
            run("run-1", RunStatus::Completed, Some(0.81)),
            run("run-2", RunStatus::Completed, Some(0.86)),
            run("run-3", RunStatus::Failed, Some(0.99)),
            run("run-4", RunStatus::Running, None),
        ];

        let best = select_best(&children, &PrimaryMetric::maximize("eval_accuracy")).unwrap();
        assert_eq!(best.id.as_str(), "run-2");
    }

    #[test]
    fn test_select_best_minimize() {
        let children = vec![
            run("run-1", RunStatus::Completed, Some(0.42)),
            run("run-2", RunStatus::Completed, Some(0.31)),
        ];

        let best = select_best(&children, &PrimaryMetric::minimize("eval_accuracy")).unwrap();
        assert_eq!(best.id.as_str(), "run-2");
    }

    #[test]
    fn test_select_best_tie_keeps_platform_order() {
        let children = vec![
            run("run-1", RunStatus::Completed, Some(0.5)),
            run("run-2", RunStatus::Completed, Some(0.5)),
        ];

        let best = select_best(&children, &PrimaryMetric::maximize("eval_accuracy")).unwrap();
        assert_eq!(best.id.as_str(), "run-1");
    }

    #[test]
    fn test_select_best_skips_missing_and_nan() {
        let children = vec![
            run("run-1", RunStatus::Completed, None),
            run("run-2", RunStatus::Completed, Some(f64::NAN)),
            run("run-3", RunStatus::Completed, Some(0.7)),
        ];

        let best = select_best(&children, &PrimaryMetric::maximize("eval_accuracy")).unwrap();
        assert_eq!(best.id.as_str(), "run-3");
    }

    #[test]
    fn test_select_best_no_candidates() {
        let children = vec![run("run-1", RunStatus::Failed, Some(0.9))];
        let result = select_best(&children, &PrimaryMetric::maximize("eval_accuracy"));
        assert!(matches!(result, Err(Error::NoCompletedRuns(_))));
    }
}
