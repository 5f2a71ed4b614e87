// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook matching.
//!
//! Pure functions turning an event and candidate hook definitions into the
//! workflow runs the event should start. One function per trigger kind.

use hk_core::{
    AnalysisStatus, ExtractData, HookRepositoryEvent, HookType, WorkflowHook, WorkflowHookMatch,
    WorkflowRunCompletion,
};
use std::collections::HashSet;

/// Manual runs target the requested workflow directly.
pub fn manual_hooks(event: &HookRepositoryEvent) -> Vec<WorkflowHookMatch> {
    let Some(trigger) = &event.extracted_data.manual else {
        return Vec::new();
    };
    let hook = WorkflowHook::new(
        "manual",
        HookType::Manual,
        &trigger.project_key,
        &trigger.workflow_name,
    )
    .on_repository(&event.vcs_server_name, &event.repository_name);
    let branch = first_non_empty(&trigger.target_branch, event.extracted_data.branch());
    let commit = first_non_empty(
        &trigger.target_commit,
        Some(event.extracted_data.commit.as_str()),
    );
    vec![WorkflowHookMatch::from_hook(&hook, branch, commit)]
}

/// The webhook's own hook, on its configured branch.
pub fn webhook_hooks(
    event: &HookRepositoryEvent,
    hook: &WorkflowHook,
) -> Vec<WorkflowHookMatch> {
    single_hook(event, hook, HookType::Webhook)
}

/// The scheduler's hook, on the branch and commit captured when it fired.
pub fn scheduler_hooks(
    event: &HookRepositoryEvent,
    hook: &WorkflowHook,
) -> Vec<WorkflowHookMatch> {
    if hook.disabled || hook.hook_type != HookType::Scheduler {
        return Vec::new();
    }
    let Some(trigger) = &event.extracted_data.scheduler else {
        return Vec::new();
    };
    if trigger.hook_id != hook.id {
        return Vec::new();
    }
    let branch = first_non_empty(&trigger.target_branch, Some(hook.data.target_branch.as_str()));
    let commit = first_non_empty(&trigger.target_commit, Some(hook.data.target_commit.as_str()));
    vec![WorkflowHookMatch::from_hook(hook, branch, commit)]
}

/// A downstream hook notified by an upstream run.
pub fn workflow_run_hooks(
    event: &HookRepositoryEvent,
    hook: &WorkflowHook,
) -> Vec<WorkflowHookMatch> {
    single_hook(event, hook, HookType::WorkflowRun)
}

/// Repository hooks accepting a push or pull request.
///
/// A hook matches when the event name, the ref and the changed paths pass
/// its filters. Branch refs go through `branch_filter`; tag refs only reach
/// hooks whose `target_tag` pattern accepts the tag. After an analysis pass
/// only hooks of projects whose analysis succeeded are kept.
pub fn repository_hooks(
    event: &HookRepositoryEvent,
    candidates: &[WorkflowHook],
) -> Vec<WorkflowHookMatch> {
    let branch = event.extracted_data.branch().unwrap_or("");
    let analysed = !event.analyses.is_empty();
    let succeeded: HashSet<&str> = event
        .analyses
        .iter()
        .filter(|a| a.status == Some(AnalysisStatus::Succeed))
        .map(|a| a.project_key.as_str())
        .collect();

    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|h| h.hook_type == HookType::Repository && !h.disabled)
        .filter(|h| !analysed || succeeded.contains(h.project_key.as_str()))
        .filter(|h| accepts_event(h, event.event_name.as_str()))
        .filter(|h| accepts_ref(h, &event.extracted_data))
        .filter(|h| accepts_paths(h, &event.extracted_data.paths))
        .filter(|h| seen.insert(h.id.clone()))
        .map(|h| WorkflowHookMatch::from_hook(h, branch, &event.extracted_data.commit))
        .collect()
}

/// Downstream hooks a finished run should notify.
pub fn cascade_targets(
    run: &WorkflowRunCompletion,
    candidates: &[WorkflowHook],
) -> Vec<WorkflowHook> {
    let branch = run.git_ref.strip_prefix("refs/heads/").unwrap_or("");
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|h| h.hook_type == HookType::WorkflowRun && !h.disabled)
        .filter(|h| h.data.target_workflow == run.workflow_name)
        .filter(|h| {
            h.data.run_statuses.is_empty()
                || h.data
                    .run_statuses
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(&run.run_status))
        })
        .filter(|h| matches_any(&h.data.branch_filter, branch))
        .filter(|h| seen.insert(h.id.clone()))
        .cloned()
        .collect()
}

fn single_hook(
    event: &HookRepositoryEvent,
    hook: &WorkflowHook,
    hook_type: HookType,
) -> Vec<WorkflowHookMatch> {
    if hook.disabled || hook.hook_type != hook_type {
        return Vec::new();
    }
    let branch = first_non_empty(&hook.data.target_branch, event.extracted_data.branch());
    let commit = first_non_empty(
        &hook.data.target_commit,
        Some(event.extracted_data.commit.as_str()),
    );
    vec![WorkflowHookMatch::from_hook(hook, branch, commit)]
}

fn first_non_empty<'a>(preferred: &'a str, fallback: Option<&'a str>) -> &'a str {
    if preferred.is_empty() {
        fallback.unwrap_or("")
    } else {
        preferred
    }
}

fn accepts_event(hook: &WorkflowHook, event_name: &str) -> bool {
    hook.data.events.is_empty() || hook.data.events.iter().any(|e| e == event_name)
}

fn accepts_ref(hook: &WorkflowHook, data: &ExtractData) -> bool {
    match data.tag() {
        Some(tag) => {
            !hook.data.target_tag.is_empty()
                && matches_any(std::slice::from_ref(&hook.data.target_tag), tag)
        }
        None => matches_any(&hook.data.branch_filter, data.branch().unwrap_or("")),
    }
}

/// Events without path information are not filtered on paths.
fn accepts_paths(hook: &WorkflowHook, paths: &[String]) -> bool {
    if hook.data.path_filter.is_empty() || paths.is_empty() {
        return true;
    }
    paths.iter().any(|p| matches_any(&hook.data.path_filter, p))
}

/// An empty pattern list accepts everything. Invalid globs compare literally.
fn matches_any(patterns: &[String], value: &str) -> bool {
    patterns.is_empty()
        || patterns.iter().any(|p| match glob::Pattern::new(p) {
            Ok(pattern) => pattern.matches(value),
            Err(_) => p == value,
        })
}

#[cfg(test)]
#[path = "matching_tests.rs"]
mod tests;
