//! REST transport
//!
//! Talks to the platform's workspace-scoped HTTP API with a bearer token.
//! All requests are JSON; non-success statuses map to typed errors, and 404
//! on lookups becomes the matching not-found variant so get-or-create flows
//! can branch on it.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;

use stratus_auth::Workspace;
use stratus_core::run::{RunId, RunRecord};
use stratus_core::sweep::SweepSpec;

use crate::artifacts::ArtifactEntry;
use crate::compute::{ComputePool, ComputeSpec};
use crate::error::{Error, Result};
use crate::platform::Platform;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    run_id: RunId,
}

/// REST client over a workspace
pub struct RestPlatform {
    client: reqwest::Client,
    endpoint: String,
    workspace: String,
    token: String,
}

impl RestPlatform {
    /// Build a transport for a resolved workspace
    ///
    /// Requires a direct API token in the credential bag; service-principal
    /// bags must be exchanged for a token before reaching this layer.
    pub fn new(workspace: &Workspace) -> Result<Self> {
        let token = workspace
            .bearer_token()
            .ok_or(Error::MissingToken)?
            .to_string();

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: workspace.endpoint().trim_end_matches('/').to_string(),
            workspace: workspace.name().to_string(),
            token,
        })
    }

    fn url(&self, suffix: &str) -> String {
        format!(
            "{}/api/v1/workspaces/{}/{}",
            self.endpoint, self.workspace, suffix
        )
    }

    fn compute_url(&self, name: &str) -> String {
        self.url(&format!("computes/{}", name))
    }

    fn run_url(&self, id: &RunId, suffix: &str) -> String {
        if suffix.is_empty() {
            self.url(&format!("runs/{}", id))
        } else {
            self.url(&format!("runs/{}/{}", id, suffix))
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url).bearer_auth(&self.token)
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url).bearer_auth(&self.token)
    }

    /// Map a response to an error unless it is a success
    ///
    /// `not_found` is returned for 404s so callers can surface the resource
    /// that was missing.
    async fn check(
        response: reqwest::Response,
        not_found: impl FnOnce() -> Error,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(not_found());
        }

        let message = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl Platform for RestPlatform {
    async fn get_compute(&self, name: &str) -> Result<ComputePool> {
        let response = self.get(&self.compute_url(name)).send().await?;
        let response = Self::check(response, || Error::compute_not_found(name)).await?;
        Ok(response.json().await?)
    }

    async fn create_compute(&self, name: &str, spec: &ComputeSpec) -> Result<ComputePool> {
        let response = self
            .post(&self.compute_url(name))
            .json(spec)
            .send()
            .await?;
        let response = Self::check(response, || Error::compute_not_found(name)).await?;
        Ok(response.json().await?)
    }

    async fn delete_compute(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.compute_url(name))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response, || Error::compute_not_found(name)).await?;
        Ok(())
    }

    async fn submit_sweep(&self, sweep: &SweepSpec) -> Result<RunId> {
        let response = self.post(&self.url("sweeps")).json(sweep).send().await?;
        let response = Self::check(response, || Error::Api {
            status: 404,
            message: "sweep endpoint not found".to_string(),
        })
        .await?;

        let submitted: SubmitResponse = response.json().await?;
        Ok(submitted.run_id)
    }

    async fn get_run(&self, id: &RunId) -> Result<RunRecord> {
        let response = self.get(&self.run_url(id, "")).send().await?;
        let response = Self::check(response, || Error::run_not_found(id.as_str())).await?;
        Ok(response.json().await?)
    }

    async fn list_children(&self, id: &RunId) -> Result<Vec<RunRecord>> {
        let response = self.get(&self.run_url(id, "children")).send().await?;
        let response = Self::check(response, || Error::run_not_found(id.as_str())).await?;
        Ok(response.json().await?)
    }

    async fn get_metrics(&self, id: &RunId) -> Result<BTreeMap<String, f64>> {
        let response = self.get(&self.run_url(id, "metrics")).send().await?;
        let response = Self::check(response, || Error::run_not_found(id.as_str())).await?;
        Ok(response.json().await?)
    }

    async fn cancel_run(&self, id: &RunId) -> Result<()> {
        let response = self.post(&self.run_url(id, "cancel")).send().await?;
        Self::check(response, || Error::run_not_found(id.as_str())).await?;
        Ok(())
    }

    async fn list_artifacts(&self, id: &RunId) -> Result<Vec<ArtifactEntry>> {
        let response = self.get(&self.run_url(id, "artifacts")).send().await?;
        let response = Self::check(response, || Error::run_not_found(id.as_str())).await?;
        Ok(response.json().await?)
    }

    async fn fetch_artifact(&self, id: &RunId, path: &str) -> Result<Vec<u8>> {
        let response = self
            .get(&self.run_url(id, "artifacts/content"))
            .query(&[("path", path)])
            .send()
            .await?;
        let response = Self::check(response, || Error::ArtifactNotFound {
            run_id: id.to_string(),
            path: path.to_string(),
        })
        .await?;

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_auth::{Credentials, WorkspaceProfile};

    fn sample_workspace(token: bool) -> Workspace {
        let mut creds = Credentials::new();
        if token {
            creds = creds.with_field("api_token", "tok");
        } else {
            creds = creds
                .with_field("tenant_id", "t")
                .with_field("client_id", "c")
                .with_field("client_secret", "s");
        }

        Workspace::resolve(
            WorkspaceProfile::new(
                "bert-finetune",
                "sub-0001",
                "ml-experiments",
                "https://platform.example.com/",
            ),
            creds,
        )
        .unwrap()
    }

    #[test]
    fn test_requires_token() {
        assert!(RestPlatform::new(&sample_workspace(true)).is_ok());
        assert!(matches!(
            RestPlatform::new(&sample_workspace(false)),
            Err(Error::MissingToken)
        ));
    }

    #[test]
    fn test_url_building() {
        let platform = RestPlatform::new(&sample_workspace(true)).unwrap();

        // trailing slash on the endpoint is normalized away
        assert_eq!(
            platform.compute_url("gpu-pool"),
            "https://platform.example.com/api/v1/workspaces/bert-finetune/computes/gpu-pool"
        );

        let id = RunId::new("sweep-1");
        assert_eq!(
            platform.run_url(&id, ""),
            "https://platform.example.com/api/v1/workspaces/bert-finetune/runs/sweep-1"
        );
        assert_eq!(
            platform.run_url(&id, "children"),
            "https://platform.example.com/api/v1/workspaces/bert-finetune/runs/sweep-1/children"
        );
    }
}
