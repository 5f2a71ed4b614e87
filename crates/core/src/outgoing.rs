// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing events: a finished workflow run fanning out to the hooks of
//! other workflows.

use crate::event::HookStatus;
use crate::hook::WorkflowHook;
use crate::keys;
use serde::{Deserialize, Serialize};

/// Lifecycle of an outgoing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutgoingStatus {
    #[default]
    Scheduled,
    Done,
    Skipped,
    Error,
}

impl OutgoingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OutgoingStatus::Scheduled)
    }
}

impl std::fmt::Display for OutgoingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutgoingStatus::Scheduled => "Scheduled",
            OutgoingStatus::Done => "Done",
            OutgoingStatus::Skipped => "Skipped",
            OutgoingStatus::Error => "Error",
        };
        f.write_str(s)
    }
}

/// The workflow run that finished
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRunCompletion {
    pub project_key: String,
    pub workflow_name: String,
    pub workflow_run_id: String,
    pub run_number: u64,
    /// Final status of the run (`Success`, `Fail`, ...)
    pub run_status: String,
    pub vcs_server_name: String,
    pub repository_name: String,
    pub git_ref: String,
    pub commit: String,
    pub user_id: String,
    pub username: String,
}

/// One downstream hook to notify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookToTrigger {
    pub hook: WorkflowHook,
    #[serde(default)]
    pub status: HookStatus,
    /// UUID of the repository event created for this hook
    #[serde(default)]
    pub event_uuid: String,
    #[serde(default)]
    pub error: String,
}

impl HookToTrigger {
    pub fn new(hook: WorkflowHook) -> Self {
        Self {
            hook,
            status: HookStatus::Scheduled,
            event_uuid: String::new(),
            error: String::new(),
        }
    }
}

/// Cascade notification for a finished workflow run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookWorkflowRunOutgoingEvent {
    pub uuid: String,
    pub created: u64,
    #[serde(default)]
    pub last_update: u64,
    #[serde(default)]
    pub status: OutgoingStatus,
    #[serde(default)]
    pub nb_errors: u32,
    #[serde(default)]
    pub last_error: String,
    pub run: WorkflowRunCompletion,
    #[serde(default)]
    pub hooks_to_triggers: Vec<HookToTrigger>,
}

impl HookWorkflowRunOutgoingEvent {
    pub fn new(uuid: impl Into<String>, run: WorkflowRunCompletion, now_ms: u64) -> Self {
        Self {
            uuid: uuid.into(),
            created: now_ms,
            last_update: now_ms,
            status: OutgoingStatus::Scheduled,
            nb_errors: 0,
            last_error: String::new(),
            run,
            hooks_to_triggers: Vec::new(),
        }
    }

    pub fn key(&self) -> String {
        keys::outgoing_event(&self.run.project_key, &self.run.workflow_name, &self.uuid)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.nb_errors = self.nb_errors.saturating_add(1);
        self.last_error = message.into();
    }

    pub fn all_triggered(&self) -> bool {
        self.hooks_to_triggers.iter().all(|h| h.status.is_terminal())
    }
}
