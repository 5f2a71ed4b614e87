// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository events and their lifecycle state.
//!
//! A [`HookRepositoryEvent`] is created for every inbound trigger and moves
//! through [`EventStatus`] one step at a time. Sub-work already completed by
//! a previous attempt (launched analyses, resolved hooks, triggered runs) is
//! recorded on the event so a retried attempt never repeats it.

use crate::hook::{HookId, HookType, WorkflowHook};
use crate::keys;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a repository event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventStatus {
    #[default]
    Scheduled,
    Analysis,
    WorkflowHooks,
    SignKey,
    Workflow,
    Done,
    Skipped,
    Error,
}

impl EventStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EventStatus::Done | EventStatus::Skipped | EventStatus::Error
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Scheduled => "Scheduled",
            EventStatus::Analysis => "Analysis",
            EventStatus::WorkflowHooks => "WorkflowHooks",
            EventStatus::SignKey => "SignKey",
            EventStatus::Workflow => "Workflow",
            EventStatus::Done => "Done",
            EventStatus::Skipped => "Skipped",
            EventStatus::Error => "Error",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized kind of trigger behind an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventName {
    Push,
    PullRequest,
    Manual,
    Webhook,
    Scheduler,
    WorkflowRun,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Push => "push",
            EventName::PullRequest => "pull-request",
            EventName::Manual => "manual",
            EventName::Webhook => "webhook",
            EventName::Scheduler => "scheduler",
            EventName::WorkflowRun => "workflow-run",
        }
    }

    /// Events that change repository content and need an analysis pass
    /// before hooks can be resolved.
    pub fn needs_analysis(&self) -> bool {
        matches!(self, EventName::Push)
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manual run requested by a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualTrigger {
    pub project_key: String,
    pub workflow_name: String,
    pub user_id: String,
    pub username: String,
    pub target_branch: String,
    pub target_commit: String,
    pub payload: serde_json::Value,
}

/// Call of a webhook hook URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookTrigger {
    pub hook_id: HookId,
}

/// Firing of a scheduler definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerTrigger {
    pub hook_id: HookId,
    pub project_key: String,
    pub workflow_name: String,
    pub target_vcs: String,
    pub target_repository: String,
    pub target_branch: String,
    pub target_commit: String,
    pub cron: String,
    pub timezone: String,
}

/// Completion of an upstream workflow run, targeting one downstream hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunTrigger {
    pub outgoing_uuid: String,
    pub hook: WorkflowHook,
    pub upstream_project: String,
    pub upstream_workflow: String,
    pub upstream_run_id: String,
    pub upstream_run_number: u64,
    pub upstream_status: String,
}

/// Provider-agnostic fields extracted from the raw payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractData {
    /// Full git ref (`refs/heads/main`, `refs/tags/v1`)
    pub git_ref: String,
    pub commit: String,
    pub commit_message: String,
    /// Paths touched by the change
    pub paths: Vec<String>,
    pub manual: Option<ManualTrigger>,
    pub webhook: Option<WebhookTrigger>,
    pub scheduler: Option<SchedulerTrigger>,
    pub workflow_run: Option<WorkflowRunTrigger>,
}

impl ExtractData {
    /// Short branch name when the ref is a branch
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/heads/")
    }

    /// Short tag name when the ref is a tag
    pub fn tag(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/tags/")
    }
}

/// Result of a repository analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    InProgress,
    Succeed,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisStatus::InProgress)
    }
}

/// One project's analysis of the event's commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisAttempt {
    pub project_key: String,
    #[serde(default)]
    pub analysis_id: String,
    /// `None` until the analysis has been launched
    #[serde(default)]
    pub status: Option<AnalysisStatus>,
}

impl AnalysisAttempt {
    pub fn new(project_key: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            analysis_id: String::new(),
            status: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|s| s.is_terminal())
    }
}

/// Sub-status of one hook entry (workflow hook match or cascade target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HookStatus {
    #[default]
    Scheduled,
    Done,
    Skipped,
}

impl HookStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HookStatus::Scheduled)
    }
}

/// A workflow to run for this event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowHookMatch {
    pub hook_id: HookId,
    pub hook_type: HookType,
    pub project_key: String,
    pub workflow_name: String,
    /// Where the workflow definition lives
    pub vcs_server_name: String,
    pub repository_name: String,
    pub target_branch: String,
    pub target_commit: String,
    #[serde(default)]
    pub status: HookStatus,
    #[serde(default)]
    pub run_id: String,
    #[serde(default)]
    pub run_number: Option<u64>,
    #[serde(default)]
    pub error: String,
}

impl WorkflowHookMatch {
    /// Build a scheduled match for `hook`, running on `branch` / `commit`.
    pub fn from_hook(hook: &WorkflowHook, branch: &str, commit: &str) -> Self {
        let (vcs, repo) = hook.workflow_location();
        Self {
            hook_id: hook.id.clone(),
            hook_type: hook.hook_type,
            project_key: hook.project_key.clone(),
            workflow_name: hook.workflow_name.clone(),
            vcs_server_name: vcs.to_string(),
            repository_name: repo.to_string(),
            target_branch: branch.to_string(),
            target_commit: commit.to_string(),
            status: HookStatus::Scheduled,
            run_id: String::new(),
            run_number: None,
            error: String::new(),
        }
    }
}

/// An inbound trigger moving through the hook pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookRepositoryEvent {
    pub uuid: String,
    /// Epoch milliseconds
    pub created: u64,
    #[serde(default)]
    pub vcs_server_type: String,
    pub vcs_server_name: String,
    pub repository_name: String,
    pub event_name: EventName,
    /// Raw provider event string
    #[serde(default)]
    pub event_type: String,
    /// Raw payload
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub extracted_data: ExtractData,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub analyses: Vec<AnalysisAttempt>,
    #[serde(default)]
    pub workflow_hooks: Vec<WorkflowHookMatch>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub sign_key: String,
    #[serde(default)]
    pub signing_key_operation: String,
    #[serde(default)]
    pub nb_errors: u32,
    #[serde(default)]
    pub last_error: String,
    /// Epoch milliseconds of the last persisted change
    #[serde(default)]
    pub last_update: u64,
}

impl HookRepositoryEvent {
    pub fn new(
        uuid: impl Into<String>,
        vcs_server_name: impl Into<String>,
        repository_name: impl Into<String>,
        event_name: EventName,
        now_ms: u64,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            created: now_ms,
            vcs_server_type: String::new(),
            vcs_server_name: vcs_server_name.into(),
            repository_name: repository_name.into(),
            event_name,
            event_type: String::new(),
            body: String::new(),
            extracted_data: ExtractData::default(),
            status: EventStatus::Scheduled,
            analyses: Vec::new(),
            workflow_hooks: Vec::new(),
            user_id: String::new(),
            username: String::new(),
            sign_key: String::new(),
            signing_key_operation: String::new(),
            nb_errors: 0,
            last_error: String::new(),
            last_update: now_ms,
        }
    }

    pub fn with_extracted_data(mut self, data: ExtractData) -> Self {
        self.extracted_data = data;
        self
    }

    /// Lower-cased `vcs-repo-uuid` identity
    pub fn identity(&self) -> String {
        keys::event_identity(&self.vcs_server_name, &self.repository_name, &self.uuid)
    }

    /// Store key holding this event
    pub fn key(&self) -> String {
        keys::repository_event(&self.vcs_server_name, &self.repository_name, &self.uuid)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a failed attempt. The counter only moves up.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.nb_errors = self.nb_errors.saturating_add(1);
        self.last_error = message.into();
    }

    /// Terminal skip with a reason
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = EventStatus::Skipped;
        self.last_error = reason.into();
    }

    /// Manual restart: back to `Scheduled` with fresh counters.
    ///
    /// Completed sub-work (analyses, triggered hooks) is kept so it is not
    /// repeated.
    pub fn restart(&mut self) {
        self.status = EventStatus::Scheduled;
        self.nb_errors = 0;
        self.last_error.clear();
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
