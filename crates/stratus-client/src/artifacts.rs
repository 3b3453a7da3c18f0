//! Artifact listings

use serde::{Deserialize, Serialize};

/// The conventional output directory training scripts write into
pub const OUTPUTS_PREFIX: &str = "outputs/";

/// One file recorded on a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Path relative to the run root (e.g. `outputs/model/weights.bin`)
    pub path: String,

    /// Size in bytes
    pub size_bytes: u64,
}

impl ArtifactEntry {
    /// Create an entry
    pub fn new(path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Whether the file lives under the conventional output directory
    pub fn is_output(&self) -> bool {
        self.path.starts_with(OUTPUTS_PREFIX)
    }

    /// Path with the output prefix stripped, for local layout
    pub fn relative_output_path(&self) -> &str {
        self.path.strip_prefix(OUTPUTS_PREFIX).unwrap_or(&self.path)
    }
}
