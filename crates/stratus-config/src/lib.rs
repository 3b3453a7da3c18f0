//! # Stratus Config
//!
//! Client configuration: the platform endpoint, workspace coordinates, and
//! polling/timeout knobs. Loaded from `.stratus/config.yaml` in the working
//! directory, then `~/.stratus/config.yaml`, with built-in defaults as the
//! fallback.

pub mod config;
pub mod error;
pub mod loader;

pub use config::{Config, Settings, WorkspaceSettings};
pub use error::{Error, Result};
pub use loader::ConfigLoader;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
