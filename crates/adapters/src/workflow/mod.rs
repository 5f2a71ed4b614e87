// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow run trigger

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorkflowRunAdapter;

use async_trait::async_trait;
use hk_core::{HookId, HookType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workflow run failures
#[derive(Debug, Error)]
pub enum WorkflowRunError {
    /// The request itself is refused; retrying cannot help
    #[error("run rejected: {0}")]
    Rejected(String),
    /// Transient; retried with the event
    #[error("workflow service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub project_key: String,
    pub workflow_name: String,
    pub vcs_server_name: String,
    pub repository_name: String,
    pub target_branch: String,
    pub target_commit: String,
    pub hook_id: HookId,
    pub hook_type: HookType,
    /// Event behind the run, for deduplication on the run side
    pub hook_event_uuid: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredRun {
    pub run_id: String,
    pub run_number: u64,
}

#[async_trait]
pub trait WorkflowRunAdapter: Clone + Send + Sync + 'static {
    async fn trigger_run(&self, request: &RunRequest) -> Result<TriggeredRun, WorkflowRunError>;
}
