//! # Stratus Client
//!
//! The platform client: compute pool lifecycle, sweep submission, status
//! polling, child-run and metric queries, and artifact download. Transport
//! is behind the [`Platform`] trait with two implementations:
//!
//! - [`RestPlatform`] for the workspace-scoped HTTP API
//! - [`LocalPlatform`] for tests and dry runs, entirely in memory

pub mod artifacts;
pub mod client;
pub mod compute;
pub mod error;
pub mod local;
pub mod platform;
pub mod rest;

pub use artifacts::{ArtifactEntry, OUTPUTS_PREFIX};
pub use client::{StratusClient, SweepHandle, DEFAULT_POLL_INTERVAL};
pub use compute::{ComputePool, ComputeSpec, ComputeStatus};
pub use error::{Error, Result};
pub use local::LocalPlatform;
pub use platform::Platform;
pub use rest::RestPlatform;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
