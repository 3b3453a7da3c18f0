//! Configuration loader

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::Config;
use crate::error::{Error, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path).await?;
        let config: Config = serde_yaml::from_str(&content)?;

        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// Order: `.stratus/config.yaml` in the working directory, then
    /// `~/.stratus/config.yaml`, then built-in defaults.
    pub async fn load_default() -> Result<Config> {
        let local_path = PathBuf::from(".stratus/config.yaml");
        if local_path.exists() {
            return Self::load_from_file(&local_path).await;
        }

        if let Some(home) = dirs::home_dir() {
            let global_path = home.join(".stratus/config.yaml");
            if global_path.exists() {
                return Self::load_from_file(&global_path).await;
            }
        }

        Ok(Config::default())
    }

    /// Save configuration to file
    pub async fn save_to_file(config: &Config, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let yaml = serde_yaml::to_string(config)?;
        fs::write(path, yaml).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = ConfigLoader::load_from_file("/nonexistent/config.yaml").await;
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.settings.poll_interval_secs = 3;
        ConfigLoader::save_to_file(&config, &path).await.unwrap();

        let loaded = ConfigLoader::load_from_file(&path).await.unwrap();
        assert_eq!(loaded.version, config.version);
        assert_eq!(loaded.settings.poll_interval_secs, 3);
    }
}
