//! Error types for stratus-auth

use thiserror::Error;

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication error types
#[derive(Error, Debug)]
pub enum Error {
    /// No usable credentials in the environment or on disk
    #[error("Credentials not found (checked environment and {0})")]
    CredentialsNotFound(String),

    /// A required credential field is absent
    #[error("Credential field missing: {0}")]
    MissingField(String),

    /// Credentials file exists but could not be parsed
    #[error("Invalid credentials file {path}: {reason}")]
    InvalidFile { path: String, reason: String },

    /// Workspace profile is incomplete
    #[error("Invalid workspace profile: {0}")]
    InvalidProfile(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a credentials-not-found error
    pub fn credentials_not_found(source_hint: impl Into<String>) -> Self {
        Self::CredentialsNotFound(source_hint.into())
    }

    /// Create a missing-field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Create an invalid-profile error
    pub fn invalid_profile(msg: impl Into<String>) -> Self {
        Self::InvalidProfile(msg.into())
    }
}
