//! Error types for stratus-client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Platform client error types
#[derive(Error, Debug)]
pub enum Error {
    /// Named compute pool does not exist
    #[error("Compute pool not found: {0}")]
    ComputeNotFound(String),

    /// Compute pool entered a failed state
    #[error("Compute pool failed: {0}")]
    ComputeFailed(String),

    /// Compute spec failed validation
    #[error("Invalid compute spec: {0}")]
    InvalidCompute(String),

    /// Run does not exist
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Artifact does not exist on the run
    #[error("Artifact '{path}' not found on run {run_id}")]
    ArtifactNotFound { run_id: String, path: String },

    /// A blocking wait exceeded its deadline
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// Workspace credentials carry no direct API token
    #[error("Workspace credentials carry no API token")]
    MissingToken,

    /// Platform returned a non-success status
    #[error("Platform error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Core validation or selection error
    #[error(transparent)]
    Core(#[from] stratus_core::Error),

    /// Auth error
    #[error(transparent)]
    Auth(#[from] stratus_auth::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a compute-not-found error
    pub fn compute_not_found(name: impl Into<String>) -> Self {
        Self::ComputeNotFound(name.into())
    }

    /// Create a run-not-found error
    pub fn run_not_found(id: impl Into<String>) -> Self {
        Self::RunNotFound(id.into())
    }

    /// Create a timeout error
    pub fn timeout(what: impl Into<String>) -> Self {
        Self::Timeout(what.into())
    }
}
