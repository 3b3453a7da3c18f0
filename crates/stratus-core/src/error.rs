//! Error types for stratus-core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core validation and selection errors
#[derive(Error, Debug)]
pub enum Error {
    /// Job descriptor failed validation
    #[error("Invalid job: {0}")]
    InvalidJob(String),

    /// Sweep descriptor failed validation
    #[error("Invalid sweep: {0}")]
    InvalidSweep(String),

    /// Package spec could not be parsed
    #[error("Invalid package spec: {0}")]
    InvalidPackage(String),

    /// No completed child run recorded the primary metric
    #[error("No completed runs recorded metric '{0}'")]
    NoCompletedRuns(String),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a job validation error
    pub fn invalid_job(msg: impl Into<String>) -> Self {
        Self::InvalidJob(msg.into())
    }

    /// Create a sweep validation error
    pub fn invalid_sweep(msg: impl Into<String>) -> Self {
        Self::InvalidSweep(msg.into())
    }

    /// Create a package parse error
    pub fn invalid_package(msg: impl Into<String>) -> Self {
        Self::InvalidPackage(msg.into())
    }
}
