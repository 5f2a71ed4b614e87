// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository analysis collaborator

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AnalysisCall, FakeAnalysisAdapter};

use async_trait::async_trait;
use hk_core::AnalysisStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis not found: {0}")]
    NotFound(String),
    #[error("analysis service unavailable: {0}")]
    Unavailable(String),
}

/// Analysis of one commit for one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub project_key: String,
    pub vcs_server_name: String,
    pub repository_name: String,
    pub git_ref: String,
    pub commit: String,
    /// Correlates the analysis with the event that requested it
    pub hook_event_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisInfo {
    pub analysis_id: String,
    pub status: AnalysisStatus,
}

#[async_trait]
pub trait AnalysisAdapter: Clone + Send + Sync + 'static {
    /// Projects that reference the repository
    async fn list_projects(&self, vcs: &str, repo: &str) -> Result<Vec<String>, AnalysisError>;

    async fn start_analysis(&self, request: &AnalysisRequest)
        -> Result<AnalysisInfo, AnalysisError>;

    async fn get_analysis(
        &self,
        project: &str,
        vcs: &str,
        repo: &str,
        analysis_id: &str,
    ) -> Result<AnalysisInfo, AnalysisError>;
}
