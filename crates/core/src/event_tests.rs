// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn push_event() -> HookRepositoryEvent {
    HookRepositoryEvent::new("UUID-1", "GitHub", "Org/Repo", EventName::Push, 1_000)
}

#[yare::parameterized(
    scheduled      = { EventStatus::Scheduled, false },
    analysis       = { EventStatus::Analysis, false },
    workflow_hooks = { EventStatus::WorkflowHooks, false },
    sign_key       = { EventStatus::SignKey, false },
    workflow       = { EventStatus::Workflow, false },
    done           = { EventStatus::Done, true },
    skipped        = { EventStatus::Skipped, true },
    error          = { EventStatus::Error, true },
)]
fn terminal_statuses(status: EventStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
}

#[test]
fn identity_and_key_are_lower_cased() {
    let event = push_event();
    assert_eq!(event.identity(), "github-org/repo-uuid-1");
    assert_eq!(event.key(), "hooks:events:repository:github-org/repo-uuid-1");
}

#[test]
fn record_error_only_increments() {
    let mut event = push_event();
    event.record_error("boom");
    event.record_error("boom again");
    assert_eq!(event.nb_errors, 2);
    assert_eq!(event.last_error, "boom again");
}

#[test]
fn restart_resets_counters_but_keeps_sub_work() {
    let mut event = push_event();
    event.status = EventStatus::Error;
    event.nb_errors = 5;
    event.last_error = "ceiling".to_string();
    event.analyses.push(AnalysisAttempt {
        project_key: "PROJ".to_string(),
        analysis_id: "a-1".to_string(),
        status: Some(AnalysisStatus::Succeed),
    });

    event.restart();

    assert_eq!(event.status, EventStatus::Scheduled);
    assert_eq!(event.nb_errors, 0);
    assert!(event.last_error.is_empty());
    assert_eq!(event.analyses.len(), 1);
}

#[test]
fn extract_data_branch_and_tag() {
    let branch = ExtractData {
        git_ref: "refs/heads/feat/x".to_string(),
        ..Default::default()
    };
    assert_eq!(branch.branch(), Some("feat/x"));
    assert_eq!(branch.tag(), None);

    let tag = ExtractData {
        git_ref: "refs/tags/v1.2".to_string(),
        ..Default::default()
    };
    assert_eq!(tag.tag(), Some("v1.2"));
    assert_eq!(tag.branch(), None);
}

#[test]
fn analysis_attempt_terminal_only_after_result() {
    let mut attempt = AnalysisAttempt::new("PROJ");
    assert!(!attempt.is_terminal());
    attempt.status = Some(AnalysisStatus::InProgress);
    assert!(!attempt.is_terminal());
    attempt.status = Some(AnalysisStatus::Failed);
    assert!(attempt.is_terminal());
}

#[test]
fn match_from_hook_uses_workflow_repository_when_set() {
    let hook = WorkflowHook::new("h1", HookType::Repository, "PROJ", "build")
        .on_repository("github", "org/app")
        .with_workflow_repository("gitlab", "org/ci");
    let m = WorkflowHookMatch::from_hook(&hook, "main", "abc");
    assert_eq!(m.vcs_server_name, "gitlab");
    assert_eq!(m.repository_name, "org/ci");
    assert_eq!(m.status, HookStatus::Scheduled);

    let local = WorkflowHook::new("h2", HookType::Repository, "PROJ", "build")
        .on_repository("github", "org/app");
    let m = WorkflowHookMatch::from_hook(&local, "main", "abc");
    assert_eq!(m.repository_name, "org/app");
}

#[test]
fn event_deserializes_with_missing_optional_fields() {
    let json = r#"{
        "uuid": "u1",
        "created": 10,
        "vcs_server_name": "github",
        "repository_name": "org/repo",
        "event_name": "pull-request"
    }"#;
    let event: HookRepositoryEvent = serde_json::from_str(json).unwrap();
    assert_eq!(event.event_name, EventName::PullRequest);
    assert_eq!(event.status, EventStatus::Scheduled);
    assert_eq!(event.nb_errors, 0);
}
