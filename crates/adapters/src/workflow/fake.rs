// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake workflow run adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RunRequest, TriggeredRun, WorkflowRunAdapter, WorkflowRunError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct FakeRunState {
    runs: Vec<RunRequest>,
    /// Remaining failures per workflow name
    failures: HashMap<String, u32>,
    /// Workflows whose triggers are refused outright
    rejected: HashMap<String, String>,
    run_numbers: HashMap<String, u64>,
}

/// Records triggered runs; failures can be scripted per workflow
#[derive(Clone, Default)]
pub struct FakeWorkflowRunAdapter {
    inner: Arc<Mutex<FakeRunState>>,
}

impl FakeWorkflowRunAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` triggers of `workflow`
    pub fn fail(&self, workflow: &str, times: u32) {
        self.inner
            .lock()
            .failures
            .insert(workflow.to_string(), times);
    }

    /// Refuse every trigger of `workflow` with `reason`
    pub fn reject(&self, workflow: &str, reason: &str) {
        self.inner
            .lock()
            .rejected
            .insert(workflow.to_string(), reason.to_string());
    }

    /// Successfully triggered runs, in order
    pub fn runs(&self) -> Vec<RunRequest> {
        self.inner.lock().runs.clone()
    }

    pub fn runs_of(&self, workflow: &str) -> usize {
        self.inner
            .lock()
            .runs
            .iter()
            .filter(|r| r.workflow_name == workflow)
            .count()
    }
}

#[async_trait]
impl WorkflowRunAdapter for FakeWorkflowRunAdapter {
    async fn trigger_run(&self, request: &RunRequest) -> Result<TriggeredRun, WorkflowRunError> {
        let mut state = self.inner.lock();
        if let Some(reason) = state.rejected.get(&request.workflow_name) {
            return Err(WorkflowRunError::Rejected(reason.clone()));
        }
        if let Some(left) = state.failures.get_mut(&request.workflow_name) {
            if *left > 0 {
                *left -= 1;
                return Err(WorkflowRunError::Unavailable(format!(
                    "scripted failure for {}",
                    request.workflow_name
                )));
            }
        }
        let number = state
            .run_numbers
            .entry(request.workflow_name.clone())
            .or_insert(0);
        *number += 1;
        let run = TriggeredRun {
            run_id: format!("run-{}-{}", request.workflow_name, number),
            run_number: *number,
        };
        state.runs.push(request.clone());
        Ok(run)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
