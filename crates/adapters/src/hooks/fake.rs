// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake hook resolver for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{HookError, HookResolver, RepositoryStatus};
use async_trait::async_trait;
use hk_core::{HookId, HookType, WorkflowHook};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Recorded resolver call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookCall {
    RepositoryStatus { vcs: String, repo: String },
    RepositoryHooks { vcs: String, repo: String },
    WorkflowRunHooks { project: String, workflow: String },
    Hook { id: String },
}

#[derive(Default)]
struct FakeHookState {
    hooks: Vec<WorkflowHook>,
    stopped: HashSet<(String, String)>,
    unavailable: bool,
    calls: Vec<HookCall>,
}

/// In-memory hook catalogue
#[derive(Clone, Default)]
pub struct FakeHookResolver {
    inner: Arc<Mutex<FakeHookState>>,
}

impl FakeHookResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a hook definition
    pub fn add_hook(&self, hook: WorkflowHook) {
        let mut state = self.inner.lock();
        state.hooks.retain(|h| h.id != hook.id);
        state.hooks.push(hook);
    }

    pub fn remove_hook(&self, id: &str) {
        self.inner.lock().hooks.retain(|h| h.id != id);
    }

    pub fn stop_repository(&self, vcs: &str, repo: &str) {
        self.inner
            .lock()
            .stopped
            .insert((vcs.to_string(), repo.to_string()));
    }

    /// Make every call fail with [`HookError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<HookCall> {
        self.inner.lock().calls.clone()
    }

    fn record(&self, call: HookCall) -> Result<(), HookError> {
        let mut state = self.inner.lock();
        state.calls.push(call);
        if state.unavailable {
            return Err(HookError::Unavailable("fake resolver offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl HookResolver for FakeHookResolver {
    async fn repository_status(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<RepositoryStatus, HookError> {
        self.record(HookCall::RepositoryStatus {
            vcs: vcs.to_string(),
            repo: repo.to_string(),
        })?;
        let stopped = self
            .inner
            .lock()
            .stopped
            .contains(&(vcs.to_string(), repo.to_string()));
        Ok(if stopped {
            RepositoryStatus::Stopped
        } else {
            RepositoryStatus::Active
        })
    }

    async fn repository_hooks(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<Vec<WorkflowHook>, HookError> {
        self.record(HookCall::RepositoryHooks {
            vcs: vcs.to_string(),
            repo: repo.to_string(),
        })?;
        Ok(self
            .inner
            .lock()
            .hooks
            .iter()
            .filter(|h| h.vcs_server_name == vcs && h.repository_name == repo)
            .cloned()
            .collect())
    }

    async fn workflow_run_hooks(
        &self,
        project: &str,
        workflow: &str,
    ) -> Result<Vec<WorkflowHook>, HookError> {
        self.record(HookCall::WorkflowRunHooks {
            project: project.to_string(),
            workflow: workflow.to_string(),
        })?;
        Ok(self
            .inner
            .lock()
            .hooks
            .iter()
            .filter(|h| {
                h.hook_type == HookType::WorkflowRun
                    && h.project_key == project
                    && h.data.target_workflow == workflow
            })
            .cloned()
            .collect())
    }

    async fn hook(&self, id: &HookId) -> Result<WorkflowHook, HookError> {
        self.record(HookCall::Hook {
            id: id.to_string(),
        })?;
        self.inner
            .lock()
            .hooks
            .iter()
            .find(|h| h.id == *id)
            .cloned()
            .ok_or_else(|| HookError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
