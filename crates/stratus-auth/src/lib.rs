//! # Stratus Auth
//!
//! Credential resolution for the stratus client. Credentials are looked up
//! in the environment first, then in `~/.stratus/credentials.json`, and a
//! validated bag is turned into a [`Workspace`] handle that every platform
//! call is scoped to.

pub mod credentials;
pub mod error;
pub mod manager;
pub mod provider;
pub mod workspace;

pub use credentials::Credentials;
pub use error::{Error, Result};
pub use manager::CredentialManager;
pub use provider::{CredentialProvider, EnvProvider, FileProvider};
pub use workspace::{Workspace, WorkspaceProfile};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
