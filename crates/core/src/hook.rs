// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow hook definitions.
//!
//! A hook binds a trigger (repository activity, a manual run, an incoming
//! webhook, a cron schedule, or another workflow's run) to a workflow. Hook
//! definitions are owned by the hook-resolution collaborator; this crate only
//! carries them around.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier of a workflow hook definition.
    pub struct HookId;
}

/// What kind of trigger a hook listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookType {
    /// Push / pull-request activity on a repository
    Repository,
    Manual,
    Webhook,
    Scheduler,
    /// Completion of a run of another workflow
    WorkflowRun,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Repository => "repository",
            HookType::Manual => "manual",
            HookType::Webhook => "webhook",
            HookType::Scheduler => "scheduler",
            HookType::WorkflowRun => "workflow-run",
        }
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific hook settings. Unused fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookData {
    /// Event names accepted by repository hooks (`push`, `pull-request`).
    /// Empty accepts every event.
    pub events: Vec<String>,
    /// Glob patterns on the short branch name. Empty accepts every branch.
    pub branch_filter: Vec<String>,
    /// Glob patterns on changed paths. Empty accepts every change.
    pub path_filter: Vec<String>,
    pub target_branch: String,
    pub target_tag: String,
    pub target_commit: String,
    pub cron: String,
    /// IANA timezone of `cron`; empty means UTC
    pub timezone: String,
    /// Upstream workflow a workflow-run hook listens on
    pub target_workflow: String,
    /// Upstream run statuses a workflow-run hook accepts. Empty accepts all.
    pub run_statuses: Vec<String>,
}

/// A hook definition attached to a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowHook {
    pub id: HookId,
    pub hook_type: HookType,
    /// VCS server the hook listens on
    pub vcs_server_name: String,
    /// Repository the hook listens on
    pub repository_name: String,
    pub project_key: String,
    pub workflow_name: String,
    /// VCS server hosting the workflow definition
    #[serde(default)]
    pub workflow_vcs_server: String,
    /// Repository hosting the workflow definition
    #[serde(default)]
    pub workflow_repository: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub data: HookData,
}

impl WorkflowHook {
    pub fn new(
        id: impl Into<String>,
        hook_type: HookType,
        project_key: impl Into<String>,
        workflow_name: impl Into<String>,
    ) -> Self {
        Self {
            id: HookId::new(id),
            hook_type,
            vcs_server_name: String::new(),
            repository_name: String::new(),
            project_key: project_key.into(),
            workflow_name: workflow_name.into(),
            workflow_vcs_server: String::new(),
            workflow_repository: String::new(),
            disabled: false,
            data: HookData::default(),
        }
    }

    /// Attach the repository this hook listens on.
    pub fn on_repository(mut self, vcs: impl Into<String>, repo: impl Into<String>) -> Self {
        self.vcs_server_name = vcs.into();
        self.repository_name = repo.into();
        self
    }

    /// Attach the repository hosting the workflow definition.
    pub fn with_workflow_repository(
        mut self,
        vcs: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        self.workflow_vcs_server = vcs.into();
        self.workflow_repository = repo.into();
        self
    }

    pub fn with_data(mut self, data: HookData) -> Self {
        self.data = data;
        self
    }

    /// Workflow definition location, falling back to the listened repository.
    pub fn workflow_location(&self) -> (&str, &str) {
        if self.workflow_vcs_server.is_empty() || self.workflow_repository.is_empty() {
            (&self.vcs_server_name, &self.repository_name)
        } else {
            (&self.workflow_vcs_server, &self.workflow_repository)
        }
    }
}
