//! Credential manager with caching

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::provider::{CredentialProvider, EnvProvider, FileProvider};

/// Resolves credentials once and caches the result
///
/// Providers are consulted in order; the first source that yields a valid
/// bag wins. The default order is environment, then credentials file.
pub struct CredentialManager {
    cache: Arc<RwLock<Option<Credentials>>>,
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialManager {
    /// Manager with the default provider order
    pub fn new() -> Self {
        Self::with_providers(vec![
            Box::new(EnvProvider::new()),
            Box::new(FileProvider::new()),
        ])
    }

    /// Manager over an explicit provider list
    pub fn with_providers(providers: Vec<Box<dyn CredentialProvider>>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(None)),
            providers,
        }
    }

    /// Get credentials, loading them on first use
    pub async fn get(&self) -> Result<Credentials> {
        {
            let cache = self.cache.read().await;
            if let Some(creds) = cache.as_ref() {
                return Ok(creds.clone());
            }
        }

        let creds = self.load().await?;

        {
            let mut cache = self.cache.write().await;
            *cache = Some(creds.clone());
        }

        Ok(creds)
    }

    /// Drop the cached credentials
    pub async fn clear_cache(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Reload credentials, bypassing the cache
    pub async fn refresh(&self) -> Result<Credentials> {
        self.clear_cache().await;
        self.get().await
    }

    /// Check if credentials are cached
    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }

    async fn load(&self) -> Result<Credentials> {
        let mut checked = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            checked.push(provider.source());
            if let Some(creds) = provider.load().await? {
                if provider.validate(&creds).await? {
                    return Ok(creds);
                }
            }
        }

        Err(Error::credentials_not_found(checked.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FileProvider;
    use std::path::Path;

    fn file_manager(path: &Path) -> CredentialManager {
        CredentialManager::with_providers(vec![Box::new(FileProvider::with_path(path))])
    }

    #[tokio::test]
    async fn test_manager_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"api_token": "tok-cache"}"#).unwrap();

        let manager = file_manager(&path);
        assert!(!manager.is_cached().await);

        let creds1 = manager.get().await.unwrap();
        assert!(creds1.from_file);
        assert!(manager.is_cached().await);

        // Second call is served from cache even if the file changed
        std::fs::write(&path, r#"{"api_token": "tok-other"}"#).unwrap();
        let creds2 = manager.get().await.unwrap();
        assert_eq!(creds1.api_token(), creds2.api_token());

        manager.clear_cache().await;
        assert!(!manager.is_cached().await);
    }

    #[tokio::test]
    async fn test_manager_not_found() {
        let manager = file_manager(Path::new("/nonexistent/creds.json"));
        let result = manager.get().await;
        assert!(matches!(result, Err(Error::CredentialsNotFound(_))));
    }

    #[tokio::test]
    async fn test_manager_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"api_token": "tok-1"}"#).unwrap();

        let manager = file_manager(&path);
        assert_eq!(manager.get().await.unwrap().api_token(), Some("tok-1"));

        std::fs::write(&path, r#"{"api_token": "tok-2"}"#).unwrap();
        let creds = manager.refresh().await.unwrap();
        assert_eq!(creds.api_token(), Some("tok-2"));
    }

    #[tokio::test]
    async fn test_manager_skips_invalid_bag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"tenant_id": "tenant-only"}"#).unwrap();

        let manager = file_manager(&path);
        assert!(matches!(
            manager.get().await,
            Err(Error::CredentialsNotFound(_))
        ));
    }
}
