//! Workspace handle resolution

use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// Identifies a workspace on the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceProfile {
    /// Workspace name
    pub name: String,

    /// Billing subscription the workspace lives under
    pub subscription_id: String,

    /// Resource group the workspace lives in
    pub resource_group: String,

    /// Base URL of the platform API
    pub endpoint: String,
}

impl WorkspaceProfile {
    /// Create a profile
    pub fn new(
        name: impl Into<String>,
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Validates the profile
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("endpoint", &self.endpoint),
        ] {
            if value.trim().is_empty() {
                return Err(Error::invalid_profile(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }
}

/// An authenticated workspace handle
///
/// Every platform call is scoped to one of these. Resolution only pairs a
/// validated profile with validated credentials; token exchange (when the
/// bag is a service principal rather than a direct token) happens on the
/// platform side.
#[derive(Debug, Clone)]
pub struct Workspace {
    profile: WorkspaceProfile,
    credentials: Credentials,
}

impl Workspace {
    /// Resolve a workspace handle from a profile and credentials
    pub fn resolve(profile: WorkspaceProfile, credentials: Credentials) -> Result<Self> {
        profile.validate()?;

        if !credentials.is_valid() {
            return Err(Error::missing_field(
                "api_token or tenant_id/client_id/client_secret",
            ));
        }

        Ok(Self {
            profile,
            credentials,
        })
    }

    /// Workspace name
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Platform API base URL
    pub fn endpoint(&self) -> &str {
        &self.profile.endpoint
    }

    /// Full profile
    pub fn profile(&self) -> &WorkspaceProfile {
        &self.profile
    }

    /// Bearer token for direct-token credentials
    pub fn bearer_token(&self) -> Option<&str> {
        self.credentials.api_token()
    }

    /// Credentials backing this handle
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}
