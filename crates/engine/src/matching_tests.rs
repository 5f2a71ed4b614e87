// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hk_core::test_support::{
    manual_event, push_event, repository_hook, run_completion, scheduler_hook, workflow_run_hook,
};
use hk_core::{AnalysisAttempt, EventName, HookData, HookStatus, SchedulerTrigger, WebhookTrigger};
use yare::parameterized;

fn filtered_hook(id: &str, data: HookData) -> WorkflowHook {
    repository_hook(id, "build").with_data(data)
}

#[test]
fn repository_hooks_without_filters_match() {
    let event = push_event("e-1", "main", "abc");
    let matches = repository_hooks(&event, &[repository_hook("h-1", "build")]);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].workflow_name, "build");
    assert_eq!(matches[0].target_branch, "main");
    assert_eq!(matches[0].target_commit, "abc");
    assert_eq!(matches[0].status, HookStatus::Scheduled);
}

#[parameterized(
    exact = { "main", &["main"], true },
    glob = { "release/1.2", &["release/*"], true },
    other = { "feature/x", &["main", "release/*"], false },
)]
fn repository_hooks_filter_branches(branch: &str, filter: &[&str], matched: bool) {
    let event = push_event("e-1", branch, "abc");
    let hook = filtered_hook(
        "h-1",
        HookData {
            branch_filter: filter.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    );
    assert_eq!(!repository_hooks(&event, &[hook]).is_empty(), matched);
}

#[parameterized(
    tag_filter_matches = { "refs/tags/v1.2", "v1.*", true },
    tag_filter_misses = { "refs/tags/nightly", "v1.*", false },
    no_tag_filter = { "refs/tags/v1.2", "", false },
    branch_ignores_tag_filter = { "refs/heads/main", "v1.*", true },
)]
fn repository_hooks_filter_tags(git_ref: &str, target_tag: &str, matched: bool) {
    let mut event = push_event("e-1", "main", "abc");
    event.extracted_data.git_ref = git_ref.to_string();
    let hook = filtered_hook(
        "h-1",
        HookData {
            target_tag: target_tag.to_string(),
            ..Default::default()
        },
    );
    assert_eq!(!repository_hooks(&event, &[hook]).is_empty(), matched);
}

#[parameterized(
    touched = { &["src/lib.rs"], &["src/**"], true },
    untouched = { &["docs/readme.md"], &["src/**"], false },
    no_path_info = { &[], &["src/**"], true },
)]
fn repository_hooks_filter_paths(paths: &[&str], filter: &[&str], matched: bool) {
    let mut event = push_event("e-1", "main", "abc");
    event.extracted_data.paths = paths.iter().map(|s| s.to_string()).collect();
    let hook = filtered_hook(
        "h-1",
        HookData {
            path_filter: filter.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        },
    );
    assert_eq!(!repository_hooks(&event, &[hook]).is_empty(), matched);
}

#[test]
fn repository_hooks_filter_event_names() {
    let push_only = filtered_hook(
        "h-1",
        HookData {
            events: vec!["push".to_string()],
            ..Default::default()
        },
    );
    let mut event = push_event("e-1", "main", "abc");
    assert_eq!(repository_hooks(&event, &[push_only.clone()]).len(), 1);

    event.event_name = EventName::PullRequest;
    assert!(repository_hooks(&event, &[push_only]).is_empty());
}

#[test]
fn repository_hooks_skip_disabled_foreign_and_duplicate_hooks() {
    let event = push_event("e-1", "main", "abc");
    let mut disabled = repository_hook("h-1", "build");
    disabled.disabled = true;
    let scheduler = scheduler_hook("h-2", "nightly", "0 0 * * *");
    let kept = repository_hook("h-3", "test");

    let matches = repository_hooks(&event, &[disabled, scheduler, kept.clone(), kept]);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].hook_id, "h-3");
}

#[test]
fn repository_hooks_keep_only_successfully_analysed_projects() {
    let mut event = push_event("e-1", "main", "abc");
    let mut ok = AnalysisAttempt::new("OK");
    ok.status = Some(AnalysisStatus::Succeed);
    let mut failed = AnalysisAttempt::new("KO");
    failed.status = Some(AnalysisStatus::Failed);
    event.analyses = vec![ok, failed];

    let mut ok_hook = repository_hook("h-1", "build");
    ok_hook.project_key = "OK".to_string();
    let mut ko_hook = repository_hook("h-2", "build");
    ko_hook.project_key = "KO".to_string();

    let matches = repository_hooks(&event, &[ok_hook, ko_hook]);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].project_key, "OK");
}

#[test]
fn repository_hooks_run_where_the_workflow_lives() {
    let event = push_event("e-1", "main", "abc");
    let hook = repository_hook("h-1", "build").with_workflow_repository("gitlab", "org/ci");
    let matches = repository_hooks(&event, &[hook]);
    assert_eq!(matches[0].vcs_server_name, "gitlab");
    assert_eq!(matches[0].repository_name, "org/ci");
}

#[test]
fn manual_hooks_use_trigger_target() {
    let mut event = manual_event("e-1", "deploy", "u-7");
    if let Some(manual) = event.extracted_data.manual.as_mut() {
        manual.target_branch = "release".to_string();
    }
    let matches = manual_hooks(&event);

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].workflow_name, "deploy");
    assert_eq!(matches[0].hook_type, HookType::Manual);
    assert_eq!(matches[0].target_branch, "release");
    assert_eq!(matches[0].target_commit, "c0ffee");
}

#[test]
fn manual_hooks_need_a_trigger() {
    let event = push_event("e-1", "main", "abc");
    assert!(manual_hooks(&event).is_empty());
}

#[test]
fn webhook_hooks_prefer_hook_target_branch() {
    let mut event = push_event("e-1", "main", "abc");
    event.event_name = EventName::Webhook;
    event.extracted_data.webhook = Some(WebhookTrigger {
        hook_id: "h-1".into(),
    });
    let mut hook = WorkflowHook::new("h-1", HookType::Webhook, "PROJ", "deploy")
        .on_repository("github", "org/app");
    hook.data.target_branch = "prod".to_string();

    let matches = webhook_hooks(&event, &hook);
    assert_eq!(matches[0].target_branch, "prod");

    hook.disabled = true;
    assert!(webhook_hooks(&event, &hook).is_empty());
}

#[test]
fn scheduler_hooks_use_fired_target() {
    let hook = scheduler_hook("h-1", "nightly", "0 0 * * *");
    let mut event = push_event("e-1", "main", "");
    event.event_name = EventName::Scheduler;
    event.extracted_data.scheduler = Some(SchedulerTrigger {
        hook_id: hook.id.clone(),
        project_key: hook.project_key.clone(),
        workflow_name: hook.workflow_name.clone(),
        target_vcs: "github".to_string(),
        target_repository: "org/app".to_string(),
        target_branch: "develop".to_string(),
        target_commit: String::new(),
        cron: hook.data.cron.clone(),
        timezone: String::new(),
    });

    let matches = scheduler_hooks(&event, &hook);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].target_branch, "develop");
    assert_eq!(matches[0].hook_type, HookType::Scheduler);

    let other = scheduler_hook("h-2", "nightly", "0 0 * * *");
    assert!(scheduler_hooks(&event, &other).is_empty());
}

#[parameterized(
    any_status = { &[], "Fail", true },
    listed = { &["Success"], "success", true },
    unlisted = { &["Success"], "Fail", false },
)]
fn cascade_targets_filter_run_status(statuses: &[&str], run_status: &str, matched: bool) {
    let mut run = run_completion("build", "r-1");
    run.run_status = run_status.to_string();
    let mut hook = workflow_run_hook("h-1", "deploy", "build");
    hook.data.run_statuses = statuses.iter().map(|s| s.to_string()).collect();

    assert_eq!(!cascade_targets(&run, &[hook]).is_empty(), matched);
}

#[test]
fn cascade_targets_filter_upstream_workflow_and_branch() {
    let run = run_completion("build", "r-1");
    let listening = workflow_run_hook("h-1", "deploy", "build");
    let elsewhere = workflow_run_hook("h-2", "deploy", "lint");
    let mut release_only = workflow_run_hook("h-3", "publish", "build");
    release_only.data.branch_filter = vec!["release/*".to_string()];

    let targets = cascade_targets(&run, &[listening, elsewhere, release_only]);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].id, "h-1");
}
