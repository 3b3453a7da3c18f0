//! Credential structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Credentials for the platform
///
/// A flat field bag: either an `api_token`, or the service-principal trio
/// `tenant_id` / `client_id` / `client_secret`. Provenance flags record
/// where the bag was loaded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Credential fields (key-value pairs)
    pub fields: HashMap<String, String>,

    /// Whether credentials were loaded from environment
    #[serde(default)]
    pub from_env: bool,

    /// Whether credentials were loaded from file
    #[serde(default)]
    pub from_file: bool,
}

impl Credentials {
    /// Create empty credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Mark as loaded from environment
    pub fn from_environment(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Mark as loaded from file
    pub fn from_file_source(mut self) -> Self {
        self.from_file = true;
        self
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&String> {
        self.fields.get(key)
    }

    /// Direct API token, if present
    pub fn api_token(&self) -> Option<&str> {
        self.fields.get("api_token").map(String::as_str)
    }

    /// Whether the bag carries a usable identity
    ///
    /// Either a direct token or the full service-principal trio.
    pub fn is_valid(&self) -> bool {
        if self.api_token().is_some() {
            return true;
        }
        ["tenant_id", "client_id", "client_secret"]
            .iter()
            .all(|field| self.get(field).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_builder() {
        let creds = Credentials::new()
            .with_field("api_token", "tok-123")
            .from_environment();

        assert_eq!(creds.api_token(), Some("tok-123"));
        assert!(creds.from_env);
        assert!(creds.is_valid());
    }

    #[test]
    fn test_service_principal_validity() {
        let creds = Credentials::new()
            .with_field("tenant_id", "tenant")
            .with_field("client_id", "client")
            .with_field("client_secret", "secret");
        assert!(creds.is_valid());

        let incomplete = Credentials::new().with_field("tenant_id", "tenant");
        assert!(!incomplete.is_valid());
    }

    #[test]
    fn test_empty_credentials() {
        assert!(!Credentials::new().is_valid());
    }
}
