//! Credential providers
//!
//! Each provider knows how to load a credential bag from one source. The
//! [`CredentialManager`](crate::manager::CredentialManager) consults them in
//! order: environment first, then the credentials file.

use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tokio::fs;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Environment variable carrying a direct API token
pub const ENV_API_TOKEN: &str = "STRATUS_API_TOKEN";

/// Service-principal environment variables
pub const ENV_TENANT_ID: &str = "STRATUS_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "STRATUS_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "STRATUS_CLIENT_SECRET";
pub const ENV_SUBSCRIPTION_ID: &str = "STRATUS_SUBSCRIPTION_ID";

/// A source of credentials
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Human-readable source name, used in error messages
    fn source(&self) -> &'static str;

    /// Load credentials from this source, `None` if the source is absent
    async fn load(&self) -> Result<Option<Credentials>>;

    /// Check a loaded bag for a usable identity
    async fn validate(&self, credentials: &Credentials) -> Result<bool> {
        Ok(credentials.is_valid())
    }
}

/// Credentials from process environment variables
#[derive(Debug, Default)]
pub struct EnvProvider;

impl EnvProvider {
    /// Create new environment provider
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialProvider for EnvProvider {
    fn source(&self) -> &'static str {
        "environment"
    }

    async fn load(&self) -> Result<Option<Credentials>> {
        if let Ok(token) = env::var(ENV_API_TOKEN) {
            let creds = Credentials::new()
                .with_field("api_token", token)
                .from_environment();
            return Ok(Some(creds));
        }

        let tenant_id = env::var(ENV_TENANT_ID).ok();
        let client_id = env::var(ENV_CLIENT_ID).ok();
        let client_secret = env::var(ENV_CLIENT_SECRET).ok();

        if let (Some(tenant), Some(client), Some(secret)) = (tenant_id, client_id, client_secret) {
            let mut creds = Credentials::new()
                .with_field("tenant_id", tenant)
                .with_field("client_id", client)
                .with_field("client_secret", secret)
                .from_environment();

            if let Ok(subscription) = env::var(ENV_SUBSCRIPTION_ID) {
                creds = creds.with_field("subscription_id", subscription);
            }

            Ok(Some(creds))
        } else {
            Ok(None)
        }
    }
}

/// Credentials from a JSON file of string fields
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    /// Provider over the default path `~/.stratus/credentials.json`
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Provider over an explicit path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default credentials file location
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stratus")
            .join("credentials.json")
    }

    /// Path this provider reads
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for FileProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialProvider for FileProvider {
    fn source(&self) -> &'static str {
        "credentials file"
    }

    async fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        let fields: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|e| Error::InvalidFile {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut creds = Credentials::new().from_file_source();
        for (key, value) in fields {
            creds = creds.with_field(key, value);
        }

        Ok(Some(creds))
    }
}
