// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    EventName, ExtractData, HookData, HookRepositoryEvent, HookType, ManualTrigger, WorkflowHook,
    WorkflowRunCompletion,
};

pub const TEST_VCS: &str = "github";
pub const TEST_REPO: &str = "org/app";
pub const TEST_PROJECT: &str = "PROJ";

// ── Event factory functions ─────────────────────────────────────────────────

pub fn push_event(uuid: &str, branch: &str, commit: &str) -> HookRepositoryEvent {
    HookRepositoryEvent::new(uuid, TEST_VCS, TEST_REPO, EventName::Push, 1_000).with_extracted_data(
        ExtractData {
            git_ref: format!("refs/heads/{}", branch),
            commit: commit.to_string(),
            ..Default::default()
        },
    )
}

pub fn pull_request_event(uuid: &str, branch: &str, commit: &str) -> HookRepositoryEvent {
    let mut event = push_event(uuid, branch, commit);
    event.event_name = EventName::PullRequest;
    event
}

pub fn manual_event(uuid: &str, workflow: &str, user_id: &str) -> HookRepositoryEvent {
    HookRepositoryEvent::new(uuid, TEST_VCS, TEST_REPO, EventName::Manual, 1_000)
        .with_extracted_data(ExtractData {
            git_ref: "refs/heads/main".to_string(),
            commit: "c0ffee".to_string(),
            manual: Some(ManualTrigger {
                project_key: TEST_PROJECT.to_string(),
                workflow_name: workflow.to_string(),
                user_id: user_id.to_string(),
                username: format!("user-{}", user_id),
                target_branch: "main".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        })
}

// ── Hook factory functions ──────────────────────────────────────────────────

pub fn repository_hook(id: &str, workflow: &str) -> WorkflowHook {
    WorkflowHook::new(id, HookType::Repository, TEST_PROJECT, workflow)
        .on_repository(TEST_VCS, TEST_REPO)
}

pub fn scheduler_hook(id: &str, workflow: &str, cron: &str) -> WorkflowHook {
    WorkflowHook::new(id, HookType::Scheduler, TEST_PROJECT, workflow)
        .on_repository(TEST_VCS, TEST_REPO)
        .with_data(HookData {
            cron: cron.to_string(),
            target_branch: "main".to_string(),
            ..Default::default()
        })
}

pub fn workflow_run_hook(id: &str, workflow: &str, upstream: &str) -> WorkflowHook {
    WorkflowHook::new(id, HookType::WorkflowRun, TEST_PROJECT, workflow)
        .on_repository(TEST_VCS, TEST_REPO)
        .with_data(HookData {
            target_workflow: upstream.to_string(),
            ..Default::default()
        })
}

pub fn run_completion(workflow: &str, run_id: &str) -> WorkflowRunCompletion {
    WorkflowRunCompletion {
        project_key: TEST_PROJECT.to_string(),
        workflow_name: workflow.to_string(),
        workflow_run_id: run_id.to_string(),
        run_number: 1,
        run_status: "Success".to_string(),
        vcs_server_name: TEST_VCS.to_string(),
        repository_name: TEST_REPO.to_string(),
        git_ref: "refs/heads/main".to_string(),
        commit: "c0ffee".to_string(),
        user_id: "u-1".to_string(),
        username: "alice".to_string(),
    }
}
