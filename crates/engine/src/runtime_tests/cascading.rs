// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow run cascade

use super::*;
use hk_core::test_support::{run_completion, workflow_run_hook, TEST_REPO, TEST_VCS};
use hk_core::{EventName, EventStatus, HookStatus, OutgoingStatus};

#[tokio::test]
async fn reported_run_is_recorded_once() {
    let ctx = setup();

    let first = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();
    let second = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();

    assert_eq!(first.uuid, second.uuid);
    assert_eq!(ctx.runtime.outgoing().queue_len().await.unwrap(), 1);
    assert_eq!(
        ctx.runtime.outgoing().in_progress_keys().await.unwrap(),
        vec![first.key()]
    );
}

#[tokio::test]
async fn run_without_listeners_is_skipped() {
    let ctx = setup();
    let outgoing = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();

    ctx.drain_outgoing().await;

    let stored = ctx.runtime.outgoing().get(&outgoing.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, OutgoingStatus::Skipped);
    assert!(ctx.runtime.outgoing().in_progress_keys().await.unwrap().is_empty());
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 0);
}

#[tokio::test]
async fn listeners_get_downstream_events() {
    let ctx = setup();
    ctx.hooks.add_hook(workflow_run_hook("h-1", "deploy", "build"));
    ctx.hooks.add_hook(workflow_run_hook("h-2", "notify", "build"));
    ctx.hooks.add_hook(workflow_run_hook("h-3", "other", "lint"));
    let outgoing = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();

    ctx.drain_outgoing().await;

    let stored = ctx.runtime.outgoing().get(&outgoing.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, OutgoingStatus::Done);
    assert_eq!(stored.hooks_to_triggers.len(), 2);
    assert!(stored
        .hooks_to_triggers
        .iter()
        .all(|h| h.status == HookStatus::Done && !h.event_uuid.is_empty()));
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 2);

    ctx.drain().await;

    let events = ctx
        .runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| e.event_name == EventName::WorkflowRun && e.status == EventStatus::Done));
    assert_eq!(ctx.workflows.runs_of("deploy"), 1);
    assert_eq!(ctx.workflows.runs_of("notify"), 1);
    let runs = ctx.workflows.runs();
    assert!(runs.iter().all(|r| r.user_id == "u-1" && r.target_commit == "c0ffee"));
    assert!(ctx.signing.calls().is_empty());
}

#[tokio::test]
async fn run_status_filter_applies() {
    let ctx = setup();
    let mut hook = workflow_run_hook("h-1", "deploy", "build");
    hook.data.run_statuses = vec!["Success".to_string()];
    ctx.hooks.add_hook(hook);
    let mut run = run_completion("build", "r-1");
    run.run_status = "Fail".to_string();

    let outgoing = ctx.runtime.notify_run_completed(run).await.unwrap();
    ctx.drain_outgoing().await;

    let stored = ctx.runtime.outgoing().get(&outgoing.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, OutgoingStatus::Skipped);
}

#[tokio::test]
async fn resolution_failure_is_retried_up_to_the_ceiling() {
    let ctx = setup();
    ctx.hooks.set_unavailable(true);
    let outgoing = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();

    ctx.drain_outgoing().await;

    let stored = ctx.runtime.outgoing().get(&outgoing.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, OutgoingStatus::Error);
    assert_eq!(stored.nb_errors, 3);
    assert!(ctx.runtime.outgoing().in_progress_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn resumed_cascade_does_not_duplicate_downstream_events() {
    let ctx = setup();
    let deploy = workflow_run_hook("h-1", "deploy", "build");
    ctx.hooks.add_hook(deploy.clone());
    ctx.hooks.add_hook(workflow_run_hook("h-2", "notify", "build"));
    let outgoing = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();

    // An earlier attempt created the first downstream event, then died
    let earlier = super::super::cascade::downstream_event(
        &outgoing.uuid,
        &outgoing.run,
        &deploy,
        ctx.clock.epoch_ms(),
    );
    ctx.submit(&earlier).await;

    ctx.drain_outgoing().await;

    let stored = ctx.runtime.outgoing().get(&outgoing.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, OutgoingStatus::Done);
    assert_eq!(stored.hooks_to_triggers[0].event_uuid, earlier.uuid);
    // The earlier event is queued again; the duplicate entry is harmless
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 3);
    let events = ctx
        .runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);

    ctx.drain().await;
    assert_eq!(ctx.workflows.runs_of("deploy"), 1);
    assert_eq!(ctx.workflows.runs_of("notify"), 1);
}

#[tokio::test]
async fn stored_but_unqueued_downstream_event_is_queued_on_retry() {
    let ctx = setup();
    let deploy = workflow_run_hook("h-1", "deploy", "build");
    ctx.hooks.add_hook(deploy.clone());
    let outgoing = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();
    let earlier = super::super::cascade::downstream_event(
        &outgoing.uuid,
        &outgoing.run,
        &deploy,
        ctx.clock.epoch_ms(),
    );
    // Saved and tracked by an earlier attempt, never queued
    ctx.runtime.events().mark_in_progress(&earlier).await.unwrap();
    ctx.runtime.events().save(&earlier).await.unwrap();

    ctx.drain_outgoing().await;

    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 1);
    ctx.drain().await;
    assert_eq!(ctx.reload(&earlier).await.status, EventStatus::Done);
    assert_eq!(ctx.workflows.runs_of("deploy"), 1);
}

#[tokio::test]
async fn cascaded_records_beyond_retention_are_pruned() {
    let ctx = setup_with_config(RuntimeConfig {
        max_outgoing_per_workflow: 1,
        ..test_config()
    });
    let first = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();
    ctx.clock.advance(Duration::from_secs(1));
    let second = ctx
        .runtime
        .notify_run_completed(run_completion("build", "r-2"))
        .await
        .unwrap();

    ctx.drain_outgoing().await;

    assert!(ctx.runtime.outgoing().get(&first.key()).await.unwrap().is_none());
    let kept = ctx
        .runtime
        .outgoing()
        .list_workflow_events("PROJ", "build")
        .await
        .unwrap();
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].uuid, second.uuid);
}

#[test]
fn downstream_uuid_depends_on_outgoing_and_hook() {
    let run = run_completion("build", "r-1");
    let a = workflow_run_hook("h-1", "deploy", "build");
    let b = workflow_run_hook("h-2", "deploy", "build");

    let first = super::super::cascade::downstream_event("o-1", &run, &a, 1);
    let again = super::super::cascade::downstream_event("o-1", &run, &a, 2);
    let other_hook = super::super::cascade::downstream_event("o-1", &run, &b, 1);
    let other_run = super::super::cascade::downstream_event("o-2", &run, &a, 1);

    assert_eq!(first.uuid, again.uuid);
    assert_ne!(first.uuid, other_hook.uuid);
    assert_ne!(first.uuid, other_run.uuid);
    assert_eq!(first.user_id, "u-1");
}
