// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook resolution: repository state and workflow hook definitions

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeHookResolver, HookCall};

use async_trait::async_trait;
use hk_core::{HookId, WorkflowHook};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from hook resolution
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook not found: {0}")]
    NotFound(String),
    #[error("hook service unavailable: {0}")]
    Unavailable(String),
}

/// Whether a repository still accepts events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryStatus {
    Active,
    Stopped,
}

/// Source of workflow hook definitions
#[async_trait]
pub trait HookResolver: Clone + Send + Sync + 'static {
    async fn repository_status(&self, vcs: &str, repo: &str)
        -> Result<RepositoryStatus, HookError>;

    /// Hooks listening on a repository (every hook type)
    async fn repository_hooks(&self, vcs: &str, repo: &str)
        -> Result<Vec<WorkflowHook>, HookError>;

    /// Workflow-run hooks listening on runs of `project/workflow`
    async fn workflow_run_hooks(
        &self,
        project: &str,
        workflow: &str,
    ) -> Result<Vec<WorkflowHook>, HookError>;

    /// One hook by id. [`HookError::NotFound`] when it was deleted.
    async fn hook(&self, id: &HookId) -> Result<WorkflowHook, HookError>;
}
