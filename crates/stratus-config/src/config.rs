//! Configuration structures

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: String,

    /// Default workspace coordinates
    #[serde(default)]
    pub workspace: Option<WorkspaceSettings>,

    /// Polling and timeout settings
    #[serde(default)]
    pub settings: Settings,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Workspace coordinates used when the CLI is not given explicit ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    /// Workspace name
    pub name: String,

    /// Billing subscription
    pub subscription_id: String,

    /// Resource group
    pub resource_group: String,

    /// Platform API base URL
    pub endpoint: String,
}

/// Polling and timeout settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Seconds between status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Deadline for a compute pool to become ready
    #[serde(default = "default_compute_timeout")]
    pub compute_timeout_secs: u64,

    /// Deadline for a submitted sweep to finish
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,

    /// Local directory artifacts are downloaded into
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Additional custom settings
    #[serde(default)]
    pub custom: HashMap<String, serde_yaml::Value>,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_compute_timeout() -> u64 {
    1200
}

fn default_run_timeout() -> u64 {
    7200
}

fn default_download_dir() -> String {
    "artifacts".to_string()
}

impl Settings {
    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Compute-ready deadline as a `Duration`
    pub fn compute_timeout(&self) -> Duration {
        Duration::from_secs(self.compute_timeout_secs)
    }

    /// Sweep-completion deadline as a `Duration`
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            compute_timeout_secs: default_compute_timeout(),
            run_timeout_secs: default_run_timeout(),
            download_dir: default_download_dir(),
            custom: HashMap::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace: None,
            settings: Settings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.settings.poll_interval_secs, 10);
        assert_eq!(config.settings.compute_timeout_secs, 1200);
        assert!(config.workspace.is_none());
    }

    #[test]
    fn test_config_parse_partial() {
        let yaml = r#"
workspace:
  name: bert-finetune
  subscription_id: sub-0001
  resource_group: ml-experiments
  endpoint: https://platform.example.com
settings:
  poll_interval_secs: 5
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let workspace = config.workspace.unwrap();
        assert_eq!(workspace.name, "bert-finetune");
        assert_eq!(config.settings.poll_interval_secs, 5);
        // unspecified fields keep their defaults
        assert_eq!(config.settings.run_timeout_secs, 7200);
        assert_eq!(config.settings.download_dir, "artifacts");
    }

    #[test]
    fn test_config_serialization() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("version"));
        assert!(yaml.contains("poll_interval_secs"));
    }
}
