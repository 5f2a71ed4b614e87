// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler instantiation and firing

use super::*;
use crate::RuntimeError;
use chrono::{TimeZone, Utc};
use hk_core::test_support::{repository_hook, scheduler_hook, TEST_REPO, TEST_VCS};
use hk_core::{keys, utc_to_ms, EventName, EventStatus, HookId, WorkflowHook};

fn at(hour: u32) -> u64 {
    utc_to_ms(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap())
}

async fn instantiate(ctx: &TestContext, hooks: &[WorkflowHook]) -> Result<usize, RuntimeError> {
    ctx.runtime
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "nightly", hooks)
        .await
}

async fn scheduler_ids(ctx: &TestContext) -> Vec<String> {
    let mut ids: Vec<String> = ctx
        .runtime
        .list_schedulers(TEST_VCS, TEST_REPO, "nightly")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.definition.id.to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn instantiate_stores_first_execution() {
    let ctx = setup();

    let stored = instantiate(&ctx, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();

    assert_eq!(stored, 1);
    let entries = ctx
        .runtime
        .list_schedulers(TEST_VCS, TEST_REPO, "nightly")
        .await
        .unwrap();
    let execution = entries[0].execution.clone().unwrap();
    assert_eq!(execution.next_execution_time, at(1));
    assert_eq!(execution.last_execution_time, None);
}

#[tokio::test]
async fn invalid_schedule_keeps_previous_definitions() {
    let ctx = setup();
    instantiate(&ctx, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();

    let err = instantiate(
        &ctx,
        &[
            scheduler_hook("h-2", "nightly", "*/5 * * * *"),
            scheduler_hook("h-3", "nightly", "61 * * * *"),
        ],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RuntimeError::InvalidSchedule { ref hook, .. } if hook == "h-3"));
    assert_eq!(scheduler_ids(&ctx).await, vec!["h-1"]);
    assert_eq!(ctx.runtime.schedules().executions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn instantiate_replaces_wholesale() {
    let ctx = setup();
    instantiate(
        &ctx,
        &[
            scheduler_hook("h-1", "nightly", "0 * * * *"),
            scheduler_hook("h-2", "nightly", "0 0 * * *"),
            scheduler_hook("h-3", "nightly", "@daily"),
        ],
    )
    .await
    .unwrap();

    instantiate(
        &ctx,
        &[
            scheduler_hook("h-3", "nightly", "@hourly"),
            scheduler_hook("h-4", "nightly", "30 2 * * 1-5"),
        ],
    )
    .await
    .unwrap();

    assert_eq!(scheduler_ids(&ctx).await, vec!["h-3", "h-4"]);
    assert_eq!(ctx.runtime.schedules().executions().await.unwrap().len(), 2);
    let h3 = ctx
        .runtime
        .schedules()
        .definition(&HookId::new("h-3"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h3.data.cron, "@hourly");
}

#[tokio::test]
async fn hook_of_another_workflow_is_rejected() {
    let ctx = setup();
    instantiate(&ctx, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();

    let err = instantiate(
        &ctx,
        &[
            scheduler_hook("h-2", "nightly", "0 0 * * *"),
            scheduler_hook("h-3", "weekly", "0 * * * *"),
        ],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RuntimeError::ForeignScheduler { ref hook, .. } if hook == "h-3"));
    assert_eq!(scheduler_ids(&ctx).await, vec!["h-1"]);

    // Nothing was filed under nightly that a weekly resync could miss
    ctx.runtime
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "weekly", &[])
        .await
        .unwrap();
    instantiate(&ctx, &[]).await.unwrap();
    ctx.clock.advance(Duration::from_secs(3600));
    assert_eq!(ctx.runtime.fire_due_schedulers().await.unwrap(), 0);
    assert!(ctx.workflows.runs().is_empty());
}

#[tokio::test]
async fn hook_listening_on_another_repository_is_rejected() {
    let ctx = setup();
    let hook = scheduler_hook("h-1", "nightly", "0 * * * *").on_repository(TEST_VCS, "org/other");

    let err = instantiate(&ctx, &[hook]).await.unwrap_err();

    assert!(matches!(err, RuntimeError::ForeignScheduler { .. }));
    assert!(ctx.runtime.schedules().executions().await.unwrap().is_empty());
}

#[tokio::test]
async fn disabled_and_foreign_hooks_are_not_scheduled() {
    let ctx = setup();
    let mut disabled = scheduler_hook("h-1", "nightly", "0 * * * *");
    disabled.disabled = true;

    let stored = instantiate(&ctx, &[disabled, repository_hook("h-2", "nightly")])
        .await
        .unwrap();

    assert_eq!(stored, 0);
    assert!(scheduler_ids(&ctx).await.is_empty());
}

#[tokio::test]
async fn delete_scheduler_removes_everything() {
    let ctx = setup();
    instantiate(
        &ctx,
        &[
            scheduler_hook("h-1", "nightly", "0 * * * *"),
            scheduler_hook("h-2", "nightly", "0 0 * * *"),
        ],
    )
    .await
    .unwrap();

    let removed = ctx
        .runtime
        .delete_scheduler(TEST_VCS, TEST_REPO, "nightly")
        .await
        .unwrap();

    assert_eq!(removed, 2);
    assert!(scheduler_ids(&ctx).await.is_empty());
    assert!(ctx.runtime.schedules().executions().await.unwrap().is_empty());
}

#[tokio::test]
async fn nothing_fires_before_due() {
    let ctx = setup();
    instantiate(&ctx, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();
    ctx.clock.advance(Duration::from_secs(59 * 60));

    assert_eq!(ctx.runtime.fire_due_schedulers().await.unwrap(), 0);
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 0);
}

#[tokio::test]
async fn due_scheduler_fires_and_runs_the_workflow() {
    let ctx = setup();
    let hook = scheduler_hook("h-1", "nightly", "0 * * * *");
    ctx.hooks.add_hook(hook.clone());
    instantiate(&ctx, &[hook]).await.unwrap();
    ctx.clock.advance(Duration::from_secs(3600));

    assert_eq!(ctx.runtime.fire_due_schedulers().await.unwrap(), 1);

    let execution = ctx
        .runtime
        .schedules()
        .execution(&HookId::new("h-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(execution.last_execution_time, Some(at(1)));
    assert_eq!(execution.next_execution_time, at(2));

    ctx.drain().await;
    let events = ctx
        .runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_name, EventName::Scheduler);
    assert_eq!(events[0].status, EventStatus::Done);
    let runs = ctx.workflows.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].workflow_name, "nightly");
    assert_eq!(runs[0].target_branch, "main");
}

#[tokio::test]
async fn missed_fire_times_collapse_into_one() {
    let ctx = setup();
    instantiate(&ctx, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();
    ctx.clock.advance(Duration::from_secs(5 * 3600 + 60));

    assert_eq!(ctx.runtime.fire_due_schedulers().await.unwrap(), 1);
    assert_eq!(ctx.runtime.fire_due_schedulers().await.unwrap(), 0);

    let execution = ctx
        .runtime
        .schedules()
        .execution(&HookId::new("h-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(execution.next_execution_time, at(6));
}

#[tokio::test]
async fn racing_instances_fire_once() {
    let first = setup();
    let second = setup_with_store(first.store.clone(), first.clock.clone(), test_config());
    instantiate(&first, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();
    first.clock.advance(Duration::from_secs(3600));

    let (a, b) = tokio::join!(
        first.runtime.fire_due_schedulers(),
        second.runtime.fire_due_schedulers()
    );

    assert_eq!(a.unwrap() + b.unwrap(), 1);
    assert_eq!(first.runtime.events().queue_len().await.unwrap(), 1);
}

#[tokio::test]
async fn refiring_the_same_time_reuses_the_event() {
    let ctx = setup();
    let hook = scheduler_hook("h-1", "nightly", "0 * * * *");
    instantiate(&ctx, &[hook.clone()]).await.unwrap();
    let execution = ctx
        .runtime
        .schedules()
        .execution(&hook.id)
        .await
        .unwrap()
        .unwrap();
    ctx.clock.advance(Duration::from_secs(3600));
    ctx.runtime.fire_scheduler(&hook.id).await.unwrap();

    // Roll the execution back as if the save had been lost
    ctx.runtime.schedules().save_execution(&execution).await.unwrap();
    ctx.runtime.fire_scheduler(&hook.id).await.unwrap();

    let events = ctx
        .runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn execution_without_definition_is_dropped() {
    let ctx = setup();
    instantiate(&ctx, &[scheduler_hook("h-1", "nightly", "0 * * * *")])
        .await
        .unwrap();
    ctx.store
        .delete(&keys::scheduler_definition("h-1"))
        .await
        .unwrap();
    ctx.clock.advance(Duration::from_secs(3600));

    assert_eq!(ctx.runtime.fire_due_schedulers().await.unwrap(), 0);
    assert!(ctx.runtime.schedules().executions().await.unwrap().is_empty());
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 0);
}

#[test]
fn scheduler_event_uuid_follows_fire_time() {
    let hook = scheduler_hook("h-1", "nightly", "0 * * * *");

    let first = super::super::scheduler::scheduler_event(&hook, at(1), at(1));
    let again = super::super::scheduler::scheduler_event(&hook, at(1), at(1) + 500);
    let next = super::super::scheduler::scheduler_event(&hook, at(2), at(2));

    assert_eq!(first.uuid, again.uuid);
    assert_ne!(first.uuid, next.uuid);
    assert_eq!(first.extracted_data.git_ref, "refs/heads/main");
}
