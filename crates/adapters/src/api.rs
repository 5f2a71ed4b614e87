// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the platform API.
//!
//! One [`ApiClient`] implements every collaborator trait. Path segments are
//! percent-encoded individually, so repository names such as `org/app`
//! travel as a single segment.

use crate::analysis::{AnalysisAdapter, AnalysisError, AnalysisInfo, AnalysisRequest};
use crate::hooks::{HookError, HookResolver, RepositoryStatus};
use crate::signing::{
    KeyOwner, SigningKeyAdapter, SigningKeyError, SigningKeyOperation, SigningKeyRequest,
};
use crate::workflow::{RunRequest, TriggeredRun, WorkflowRunAdapter, WorkflowRunError};
use async_trait::async_trait;
use hk_core::{HookId, WorkflowHook};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from the platform API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("api error ({status}): {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct RepositoryStatusResponse {
    status: RepositoryStatus,
}

#[derive(Debug, Serialize)]
struct AnalysisBody<'a> {
    branch: &'a str,
    commit: &'a str,
    hook_event_uuid: &'a str,
}

/// Authenticated client for the platform API
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            token: token.to_string(),
        })
    }

    /// `base` followed by `segments`, each percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(segments)?;
        let mut request = self.client.request(method.clone(), url.clone());
        if !self.token.is_empty() {
            request = request.bearer_auth(&self.token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        tracing::debug!(%method, %url, "api request");
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.path().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, segments, None).await
    }

    async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(Method::POST, segments, Some(body)).await
    }
}

impl From<ApiError> for HookError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound(what) => HookError::NotFound(what),
            other => HookError::Unavailable(other.to_string()),
        }
    }
}

impl From<ApiError> for AnalysisError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound(what) => AnalysisError::NotFound(what),
            other => AnalysisError::Unavailable(other.to_string()),
        }
    }
}

impl From<ApiError> for SigningKeyError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound(what) => SigningKeyError::NotFound(what),
            other => SigningKeyError::Unavailable(other.to_string()),
        }
    }
}

impl From<ApiError> for WorkflowRunError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Status { status, body } if (400..500).contains(&status) => {
                WorkflowRunError::Rejected(format!("{status}: {body}"))
            }
            ApiError::NotFound(what) => WorkflowRunError::Rejected(format!("not found: {what}")),
            other => WorkflowRunError::Unavailable(other.to_string()),
        }
    }
}

#[async_trait]
impl HookResolver for ApiClient {
    async fn repository_status(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<RepositoryStatus, HookError> {
        let resp: RepositoryStatusResponse = self
            .get(&["v2", "repository", vcs, repo, "status"])
            .await?;
        Ok(resp.status)
    }

    async fn repository_hooks(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<Vec<WorkflowHook>, HookError> {
        Ok(self.get(&["v2", "repository", vcs, repo, "hooks"]).await?)
    }

    async fn workflow_run_hooks(
        &self,
        project: &str,
        workflow: &str,
    ) -> Result<Vec<WorkflowHook>, HookError> {
        Ok(self
            .get(&["v2", "project", project, "workflow", workflow, "hooks", "workflow-run"])
            .await?)
    }

    async fn hook(&self, id: &HookId) -> Result<WorkflowHook, HookError> {
        Ok(self.get(&["v2", "hooks", id.as_str()]).await?)
    }
}

#[async_trait]
impl AnalysisAdapter for ApiClient {
    async fn list_projects(&self, vcs: &str, repo: &str) -> Result<Vec<String>, AnalysisError> {
        Ok(self.get(&["v2", "repository", vcs, repo, "projects"]).await?)
    }

    async fn start_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisInfo, AnalysisError> {
        let body = AnalysisBody {
            branch: &request.git_ref,
            commit: &request.commit,
            hook_event_uuid: &request.hook_event_uuid,
        };
        Ok(self
            .post(
                &[
                    "v2",
                    "project",
                    &request.project_key,
                    "repository",
                    &request.vcs_server_name,
                    &request.repository_name,
                    "analysis",
                ],
                &body,
            )
            .await?)
    }

    async fn get_analysis(
        &self,
        project: &str,
        vcs: &str,
        repo: &str,
        analysis_id: &str,
    ) -> Result<AnalysisInfo, AnalysisError> {
        Ok(self
            .get(&["v2", "project", project, "repository", vcs, repo, "analysis", analysis_id])
            .await?)
    }
}

#[async_trait]
impl SigningKeyAdapter for ApiClient {
    async fn start_operation(
        &self,
        request: &SigningKeyRequest,
    ) -> Result<SigningKeyOperation, SigningKeyError> {
        Ok(self.post(&["v2", "signing-key", "operation"], request).await?)
    }

    async fn get_operation(&self, uuid: &str) -> Result<SigningKeyOperation, SigningKeyError> {
        Ok(self.get(&["v2", "signing-key", "operation", uuid]).await?)
    }

    async fn key_owner(&self, key_id: &str) -> Result<KeyOwner, SigningKeyError> {
        Ok(self.get(&["v2", "signing-key", key_id, "owner"]).await?)
    }
}

#[async_trait]
impl WorkflowRunAdapter for ApiClient {
    async fn trigger_run(&self, request: &RunRequest) -> Result<TriggeredRun, WorkflowRunError> {
        Ok(self
            .post(
                &[
                    "v2",
                    "project",
                    &request.project_key,
                    "workflow",
                    &request.workflow_name,
                    "run",
                ],
                request,
            )
            .await?)
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
