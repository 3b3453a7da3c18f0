//! Job descriptor
//!
//! A `JobSpec` bundles everything the platform needs to execute one training
//! run: the entry script, its arguments, the compute pool to run on, node and
//! per-node process counts, the distributed launch mode, and the package
//! environment. It is declarative only; execution happens remotely.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Distributed launch mode for multi-process training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributedMode {
    /// MPI launcher (one process per slot)
    Mpi,
    /// Gloo collective backend
    Gloo,
    /// NCCL collective backend
    Nccl,
    /// Parameter-server topology
    ParameterServer,
}

impl DistributedMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mpi => "mpi",
            Self::Gloo => "gloo",
            Self::Nccl => "nccl",
            Self::ParameterServer => "parameter_server",
        }
    }
}

impl fmt::Display for DistributedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A package requirement, optionally pinned to an exact version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PackageSpec {
    /// Package name
    pub name: String,

    /// Exact version, if pinned
    pub version: Option<String>,
}

impl PackageSpec {
    /// Create an unpinned package requirement
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Create a version-pinned package requirement
    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }
}

impl FromStr for PackageSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::invalid_package("empty package spec"));
        }

        match s.split_once("==") {
            Some((name, version)) => {
                if name.is_empty() || version.is_empty() {
                    return Err(Error::invalid_package(s));
                }
                Ok(Self::pinned(name, version))
            }
            None => Ok(Self::new(s)),
        }
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}=={}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<PackageSpec> for String {
    fn from(pkg: PackageSpec) -> Self {
        pkg.to_string()
    }
}

impl TryFrom<String> for PackageSpec {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

fn default_count() -> u32 {
    1
}

fn default_distributed() -> DistributedMode {
    DistributedMode::Mpi
}

/// Package environment for a job
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvSpec {
    /// Packages installed before the entry script runs
    #[serde(default)]
    pub packages: Vec<PackageSpec>,

    /// Base container image, if overriding the platform default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
}

/// Declarative description of one training job
///
/// Built with the builder methods and validated before submission:
///
/// ```rust
/// use stratus_core::job::{DistributedMode, JobSpec, PackageSpec};
///
/// let job = JobSpec::new("train.py")
///     .with_arg("--epochs", "3")
///     .with_compute_target("gpu-pool")
///     .with_gpu(true)
///     .with_node_count(4)
///     .with_process_count_per_node(2)
///     .with_distributed(DistributedMode::Mpi)
///     .with_package(PackageSpec::pinned("transformers", "2.0.0"));
/// assert!(job.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    /// Entry script, relative to the submitted source directory
    entry_script: String,

    /// Ordered script arguments as name/value pairs
    #[serde(default)]
    args: Vec<(String, String)>,

    /// Name of the compute pool the job runs on
    compute_target: String,

    /// Whether the job requests GPU machines
    #[serde(default)]
    use_gpu: bool,

    /// Number of nodes
    #[serde(default = "default_count")]
    node_count: u32,

    /// Worker processes launched per node
    #[serde(default = "default_count")]
    process_count_per_node: u32,

    /// Distributed launch mode
    #[serde(rename = "distributed_mode", default = "default_distributed")]
    distributed: DistributedMode,

    /// Package environment
    #[serde(flatten)]
    environment: EnvSpec,
}

impl JobSpec {
    /// Create a single-node, single-process MPI job for an entry script
    pub fn new(entry_script: impl Into<String>) -> Self {
        Self {
            entry_script: entry_script.into(),
            args: Vec::new(),
            compute_target: String::new(),
            use_gpu: false,
            node_count: 1,
            process_count_per_node: 1,
            distributed: DistributedMode::Mpi,
            environment: EnvSpec::default(),
        }
    }

    // ========== Builder Methods ==========

    /// Append a script argument (insertion order is preserved on the wire)
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((name.into(), value.into()));
        self
    }

    /// Set the compute pool the job runs on
    pub fn with_compute_target(mut self, name: impl Into<String>) -> Self {
        self.compute_target = name.into();
        self
    }

    /// Request GPU machines
    pub fn with_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    /// Set the node count
    pub fn with_node_count(mut self, nodes: u32) -> Self {
        self.node_count = nodes;
        self
    }

    /// Set the worker process count per node
    pub fn with_process_count_per_node(mut self, processes: u32) -> Self {
        self.process_count_per_node = processes;
        self
    }

    /// Set the distributed launch mode
    pub fn with_distributed(mut self, mode: DistributedMode) -> Self {
        self.distributed = mode;
        self
    }

    /// Add a package requirement
    pub fn with_package(mut self, package: PackageSpec) -> Self {
        self.environment.packages.push(package);
        self
    }

    /// Set the base container image
    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.environment.docker_image = Some(image.into());
        self
    }

    // ========== Getters ==========

    /// Returns the entry script
    pub fn entry_script(&self) -> &str {
        &self.entry_script
    }

    /// Returns the ordered script arguments
    pub fn args(&self) -> &[(String, String)] {
        &self.args
    }

    /// Returns the compute pool name
    pub fn compute_target(&self) -> &str {
        &self.compute_target
    }

    /// Returns whether GPU machines are requested
    pub fn use_gpu(&self) -> bool {
        self.use_gpu
    }

    /// Returns the node count
    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    /// Returns the worker process count per node
    pub fn process_count_per_node(&self) -> u32 {
        self.process_count_per_node
    }

    /// Returns the distributed launch mode
    pub fn distributed(&self) -> DistributedMode {
        self.distributed
    }

    /// Returns the package environment
    pub fn environment(&self) -> &EnvSpec {
        &self.environment
    }

    /// Total worker processes across the job
    pub fn total_processes(&self) -> u32 {
        self.node_count * self.process_count_per_node
    }

    // ========== Validation ==========

    /// Validates the job descriptor
    pub fn validate(&self) -> Result<()> {
        if self.entry_script.trim().is_empty() {
            return Err(Error::invalid_job("entry script must not be empty"));
        }

        if self.compute_target.trim().is_empty() {
            return Err(Error::invalid_job("compute target must not be empty"));
        }

        if self.node_count == 0 {
            return Err(Error::invalid_job("node count must be at least 1"));
        }

        if self.process_count_per_node == 0 {
            return Err(Error::invalid_job(
                "process count per node must be at least 1",
            ));
        }

        let mut seen_args = HashSet::new();
        for (name, _) in &self.args {
            if !seen_args.insert(name.as_str()) {
                return Err(Error::invalid_job(format!("duplicate argument '{}'", name)));
            }
        }

        let mut seen_packages = HashSet::new();
        for package in &self.environment.packages {
            if !seen_packages.insert(package.name.as_str()) {
                return Err(Error::invalid_job(format!(
                    "duplicate package '{}'",
                    package.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> JobSpec {
        JobSpec::new("train.py")
            .with_arg("--max_seq_length", "128")
            .with_arg("--learning_rate", "3e-5")
            .with_compute_target("gpu-pool")
            .with_gpu(true)
            .with_node_count(2)
            .with_process_count_per_node(4)
            .with_distributed(DistributedMode::Mpi)
            .with_package(PackageSpec::pinned("transformers", "2.0.0"))
            .with_package(PackageSpec::new("h5py"))
    }

    #[test]
    fn test_package_spec_parsing() {
        let pkg: PackageSpec = "transformers==2.0.0".parse().unwrap();
        assert_eq!(pkg.name, "transformers");
        assert_eq!(pkg.version.as_deref(), Some("2.0.0"));
        assert_eq!(pkg.to_string(), "transformers==2.0.0");

        let pkg: PackageSpec = "h5py".parse().unwrap();
        assert!(pkg.version.is_none());
        assert_eq!(pkg.to_string(), "h5py");

        assert!("".parse::<PackageSpec>().is_err());
        assert!("pkg==".parse::<PackageSpec>().is_err());
    }

    #[test]
    fn test_job_builder() {
        let job = sample_job();
        assert_eq!(job.entry_script(), "train.py");
        assert_eq!(job.args().len(), 2);
        assert_eq!(job.args()[0].0, "--max_seq_length");
        assert_eq!(job.compute_target(), "gpu-pool");
        assert!(job.use_gpu());
        assert_eq!(job.total_processes(), 8);
        assert_eq!(job.distributed(), DistributedMode::Mpi);
    }

    #[test]
    fn test_job_validation() {
        assert!(sample_job().validate().is_ok());

        let job = JobSpec::new("").with_compute_target("pool");
        assert!(job.validate().is_err());

        let job = JobSpec::new("train.py");
        assert!(job.validate().is_err(), "missing compute target");

        let job = sample_job().with_node_count(0);
        assert!(job.validate().is_err());

        let job = sample_job().with_arg("--max_seq_length", "256");
        assert!(job.validate().is_err(), "duplicate argument");

        let job = sample_job().with_package(PackageSpec::new("h5py"));
        assert!(job.validate().is_err(), "duplicate package");
    }

    #[test]
    fn test_job_wire_shape() {
        let json = serde_json::to_value(sample_job()).unwrap();
        assert_eq!(json["entry_script"], "train.py");
        assert_eq!(json["distributed_mode"], "mpi");
        assert_eq!(json["packages"][0], "transformers==2.0.0");
        assert_eq!(json["packages"][1], "h5py");
        assert_eq!(json["node_count"], 2);

        let back: JobSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back.environment().packages.len(), 2);
        assert_eq!(back.args()[1].1, "3e-5");
    }
}
