// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hk_core::{HookId, HookType};

fn request(workflow: &str) -> RunRequest {
    RunRequest {
        project_key: "PROJ".to_string(),
        workflow_name: workflow.to_string(),
        vcs_server_name: "github".to_string(),
        repository_name: "org/app".to_string(),
        target_branch: "main".to_string(),
        target_commit: "abc".to_string(),
        hook_id: HookId::new("h-1"),
        hook_type: HookType::Repository,
        hook_event_uuid: "e-1".to_string(),
        user_id: "u-1".to_string(),
        username: "alice".to_string(),
        payload: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn scripted_failures_run_out() {
    let adapter = FakeWorkflowRunAdapter::new();
    adapter.fail("build", 2);

    assert!(adapter.trigger_run(&request("build")).await.is_err());
    assert!(adapter.trigger_run(&request("build")).await.is_err());
    let run = adapter.trigger_run(&request("build")).await.unwrap();

    assert_eq!(run.run_number, 1);
    assert_eq!(adapter.runs_of("build"), 1);
}

#[tokio::test]
async fn run_numbers_are_per_workflow() {
    let adapter = FakeWorkflowRunAdapter::new();
    adapter.trigger_run(&request("build")).await.unwrap();
    let second = adapter.trigger_run(&request("build")).await.unwrap();
    let deploy = adapter.trigger_run(&request("deploy")).await.unwrap();

    assert_eq!(second.run_number, 2);
    assert_eq!(deploy.run_number, 1);
    assert_eq!(adapter.runs().len(), 3);
}

#[tokio::test]
async fn rejected_workflow_never_runs() {
    let adapter = FakeWorkflowRunAdapter::new();
    adapter.reject("build", "workflow disabled");

    let err = adapter.trigger_run(&request("build")).await.unwrap_err();

    assert!(matches!(err, WorkflowRunError::Rejected(ref r) if r == "workflow disabled"));
    assert_eq!(adapter.runs_of("build"), 0);
}
