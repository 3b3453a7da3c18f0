//! Hyperparameter sweep descriptor
//!
//! A `SweepSpec` wraps a [`JobSpec`](crate::job::JobSpec) with a sampling
//! strategy, a parameter space, a primary metric, and run-count limits. The
//! client enumerates grid spaces locally only to report the planned run count;
//! sampling itself is the platform's job.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::job::JobSpec;

/// Sampling strategy for a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Exhaustive enumeration of the Cartesian product
    Grid,
    /// Uniform random draws from the candidate sets
    Random,
    /// Bayesian optimization over the candidate sets
    Bayesian,
}

/// A single hyperparameter candidate value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating-point value
    Float(f64),
    /// String value
    Str(String),
}

impl ParamValue {
    /// Render the value the way it is passed to a training script
    pub fn as_arg(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// One concrete choice of hyperparameters for a child run
pub type Assignment = BTreeMap<String, ParamValue>;

/// Ordered mapping from parameter name to its finite candidate list
///
/// Parameters keep insertion order; grid enumeration varies the last
/// parameter fastest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSpace {
    params: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterSpace {
    /// Create an empty parameter space
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter with its candidate values
    pub fn with_choice(
        mut self,
        name: impl Into<String>,
        candidates: Vec<ParamValue>,
    ) -> Self {
        self.params.push((name.into(), candidates));
        self
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the space has no parameters
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ParamValue])> {
        self.params
            .iter()
            .map(|(name, candidates)| (name.as_str(), candidates.as_slice()))
    }

    /// Size of the full grid (product of candidate-list lengths)
    ///
    /// The empty space has one point: the empty assignment.
    pub fn grid_size(&self) -> usize {
        self.params
            .iter()
            .map(|(_, candidates)| candidates.len())
            .product()
    }

    /// Enumerate the Cartesian product of all candidate lists
    pub fn grid_points(&self) -> Vec<Assignment> {
        let mut points = vec![Assignment::new()];
        for (name, candidates) in &self.params {
            let mut next = Vec::with_capacity(points.len() * candidates.len());
            for point in &points {
                for value in candidates {
                    let mut expanded = point.clone();
                    expanded.insert(name.clone(), value.clone());
                    next.push(expanded);
                }
            }
            points = next;
        }
        points
    }

    /// Validates the space
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for (name, candidates) in &self.params {
            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_sweep(format!(
                    "duplicate parameter '{}'",
                    name
                )));
            }
            if candidates.is_empty() {
                return Err(Error::invalid_sweep(format!(
                    "parameter '{}' has no candidate values",
                    name
                )));
            }
        }
        Ok(())
    }
}

// On the wire a parameter space is a plain JSON/YAML mapping. A map type
// that preserves insertion order is not in the stdlib, so (de)serialization
// is spelled out over the backing Vec.
impl Serialize for ParameterSpace {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len()))?;
        for (name, candidates) in &self.params {
            map.serialize_entry(name, candidates)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ParameterSpace {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct SpaceVisitor;

        impl<'de> Visitor<'de> for SpaceVisitor {
            type Value = ParameterSpace;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from parameter name to candidate values")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut params = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, candidates)) =
                    access.next_entry::<String, Vec<ParamValue>>()?
                {
                    params.push((name, candidates));
                }
                Ok(ParameterSpace { params })
            }
        }

        deserializer.deserialize_map(SpaceVisitor)
    }
}

/// Optimization direction for the primary metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricGoal {
    /// Lower is better
    Minimize,
    /// Higher is better
    Maximize,
}

/// The single metric a sweep is scored by
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryMetric {
    /// Metric name as logged by the training script
    pub name: String,

    /// Optimization direction
    pub goal: MetricGoal,
}

impl PrimaryMetric {
    /// Create a metric to minimize
    pub fn minimize(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: MetricGoal::Minimize,
        }
    }

    /// Create a metric to maximize
    pub fn maximize(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goal: MetricGoal::Maximize,
        }
    }
}

/// Early termination policy, enforced by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EarlyTermination {
    /// Terminate runs whose metric trails the best by a slack factor
    Bandit {
        slack_factor: f64,
        evaluation_interval: u32,
        delay_evaluation: u32,
    },
    /// Terminate runs below the running median
    MedianStopping {
        evaluation_interval: u32,
        delay_evaluation: u32,
    },
}

/// Declarative description of a hyperparameter sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSpec {
    /// The job template every child run executes
    pub job: JobSpec,

    /// Sampling strategy
    pub sampling: Sampling,

    /// Parameter space searched over
    pub parameter_space: ParameterSpace,

    /// Metric the sweep is scored by
    pub primary_metric: PrimaryMetric,

    /// Upper bound on child runs
    pub max_total_runs: u32,

    /// Upper bound on concurrently executing child runs
    pub max_concurrent_runs: u32,

    /// Optional early termination policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_termination: Option<EarlyTermination>,
}

impl SweepSpec {
    /// Create a grid sweep over an empty space with both limits at 1
    pub fn new(job: JobSpec, primary_metric: PrimaryMetric) -> Self {
        Self {
            job,
            sampling: Sampling::Grid,
            parameter_space: ParameterSpace::new(),
            primary_metric,
            max_total_runs: 1,
            max_concurrent_runs: 1,
            early_termination: None,
        }
    }

    // ========== Builder Methods ==========

    /// Set the sampling strategy
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Add a parameter with its candidate values
    pub fn with_choice(
        mut self,
        name: impl Into<String>,
        candidates: Vec<ParamValue>,
    ) -> Self {
        self.parameter_space = self.parameter_space.with_choice(name, candidates);
        self
    }

    /// Set the child-run limit
    pub fn with_max_total_runs(mut self, limit: u32) -> Self {
        self.max_total_runs = limit;
        self
    }

    /// Set the concurrency limit
    pub fn with_max_concurrent_runs(mut self, limit: u32) -> Self {
        self.max_concurrent_runs = limit;
        self
    }

    /// Set the early termination policy
    pub fn with_early_termination(mut self, policy: EarlyTermination) -> Self {
        self.early_termination = Some(policy);
        self
    }

    /// Number of child runs the sweep will launch
    ///
    /// Grid sweeps are capped by the grid size; random and Bayesian sweeps
    /// run up to the configured limit.
    pub fn planned_runs(&self) -> u32 {
        match self.sampling {
            Sampling::Grid => {
                let grid = self.parameter_space.grid_size();
                (grid as u64).min(self.max_total_runs as u64) as u32
            }
            Sampling::Random | Sampling::Bayesian => self.max_total_runs,
        }
    }

    /// Validates the sweep and its embedded job
    pub fn validate(&self) -> Result<()> {
        self.job.validate()?;
        self.parameter_space.validate()?;

        if self.max_total_runs == 0 {
            return Err(Error::invalid_sweep("max_total_runs must be at least 1"));
        }

        if self.max_concurrent_runs == 0 {
            return Err(Error::invalid_sweep(
                "max_concurrent_runs must be at least 1",
            ));
        }

        if self.max_concurrent_runs > self.max_total_runs {
            return Err(Error::invalid_sweep(
                "max_concurrent_runs must not exceed max_total_runs",
            ));
        }

        if self.primary_metric.name.trim().is_empty() {
            return Err(Error::invalid_sweep("primary metric name must not be empty"));
        }

        Ok(())
    }

    /// Parse a sweep from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Render the sweep as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobSpec;

    fn sample_job() -> JobSpec {
        JobSpec::new("train.py")
            .with_compute_target("gpu-pool")
            .with_gpu(true)
    }

    fn sample_sweep() -> SweepSpec {
        SweepSpec::new(sample_job(), PrimaryMetric::maximize("eval_accuracy"))
            .with_choice("learning_rate", vec![3e-5.into(), 5e-5.into()])
            .with_choice("batch_size", vec![16.into(), 32.into(), 64.into()])
            .with_max_total_runs(10)
            .with_max_concurrent_runs(4)
    }

    #[test]
    fn test_grid_enumeration_order() {
        let space = ParameterSpace::new()
            .with_choice("a", vec![1.into(), 2.into()])
            .with_choice("b", vec!["x".into(), "y".into()]);

        assert_eq!(space.grid_size(), 4);

        let points = space.grid_points();
        assert_eq!(points.len(), 4);
        // last parameter varies fastest
        assert_eq!(points[0]["a"], ParamValue::Int(1));
        assert_eq!(points[0]["b"], ParamValue::Str("x".into()));
        assert_eq!(points[1]["a"], ParamValue::Int(1));
        assert_eq!(points[1]["b"], ParamValue::Str("y".into()));
        assert_eq!(points[2]["a"], ParamValue::Int(2));
    }

    #[test]
    fn test_empty_space_single_point() {
        let space = ParameterSpace::new();
        assert_eq!(space.grid_size(), 1);
        assert_eq!(space.grid_points(), vec![Assignment::new()]);
    }

    #[test]
    fn test_degenerate_grid_is_one_run() {
        let sweep = SweepSpec::new(sample_job(), PrimaryMetric::maximize("eval_accuracy"))
            .with_choice("learning_rate", vec![3e-5.into()])
            .with_choice("batch_size", vec![32.into()]);

        assert_eq!(sweep.planned_runs(), 1);
        assert!(sweep.validate().is_ok());
    }

    #[test]
    fn test_planned_runs_capped_by_limit() {
        let sweep = sample_sweep().with_max_total_runs(4);
        assert_eq!(sweep.parameter_space.grid_size(), 6);
        assert_eq!(sweep.planned_runs(), 4);

        let sweep = sample_sweep().with_sampling(Sampling::Random).with_max_total_runs(20);
        assert_eq!(sweep.planned_runs(), 20);
    }

    #[test]
    fn test_sweep_validation() {
        assert!(sample_sweep().validate().is_ok());

        let sweep = sample_sweep().with_max_total_runs(0);
        assert!(sweep.validate().is_err());

        let sweep = sample_sweep()
            .with_max_total_runs(2)
            .with_max_concurrent_runs(4);
        assert!(sweep.validate().is_err(), "concurrency above total");

        let sweep = sample_sweep().with_choice("empty", vec![]);
        assert!(sweep.validate().is_err(), "empty candidate list");

        let sweep = sample_sweep().with_choice("learning_rate", vec![1e-4.into()]);
        assert!(sweep.validate().is_err(), "duplicate parameter");
    }

    #[test]
    fn test_sweep_yaml_round_trip() {
        let sweep = sample_sweep().with_early_termination(EarlyTermination::Bandit {
            slack_factor: 0.1,
            evaluation_interval: 1,
            delay_evaluation: 5,
        });

        let yaml = sweep.to_yaml().unwrap();
        let parsed = SweepSpec::from_yaml(&yaml).unwrap();

        assert_eq!(parsed.sampling, Sampling::Grid);
        assert_eq!(parsed.parameter_space, sweep.parameter_space);
        assert_eq!(parsed.primary_metric, sweep.primary_metric);
        assert_eq!(parsed.early_termination, sweep.early_termination);
    }

    #[test]
    fn test_sweep_from_yaml_file_format() {
        let yaml = r#"
job:
  entry_script: train_distributed.py
  args:
    - ["--max_seq_length", "128"]
  compute_target: gpu-pool
  use_gpu: true
  node_count: 2
  process_count_per_node: 4
  distributed_mode: mpi
  packages:
    - transformers==2.0.0
    - h5py
sampling: grid
parameter_space:
  learning_rate: [3.0e-5]
  train_batch_size: [32]
primary_metric:
  name: eval_accuracy
  goal: maximize
max_total_runs: 1
max_concurrent_runs: 1
"#;
        let sweep = SweepSpec::from_yaml(yaml).unwrap();
        assert!(sweep.validate().is_ok());
        assert_eq!(sweep.job.entry_script(), "train_distributed.py");
        assert_eq!(sweep.job.environment().packages.len(), 2);
        assert_eq!(sweep.planned_runs(), 1);

        let mut params = sweep.parameter_space.iter();
        let (name, candidates) = params.next().unwrap();
        assert_eq!(name, "learning_rate");
        assert_eq!(candidates, &[ParamValue::Float(3.0e-5)]);
        let (name, candidates) = params.next().unwrap();
        assert_eq!(name, "train_batch_size");
        assert_eq!(candidates, &[ParamValue::Int(32)]);
    }

    #[test]
    fn test_parameter_space_wire_shape() {
        let sweep = sample_sweep();
        let json = serde_json::to_value(&sweep).unwrap();
        assert!(json["parameter_space"].is_object());
        assert_eq!(json["parameter_space"]["batch_size"][1], 32);
        assert_eq!(json["primary_metric"]["goal"], "maximize");
    }
}
