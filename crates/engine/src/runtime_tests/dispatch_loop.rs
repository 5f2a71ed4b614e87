// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue, lock and retry handling of repository events

use super::*;
use crate::RuntimeError;
use async_trait::async_trait;
use hk_adapters::{HookError, HookResolver, RepositoryStatus};
use hk_core::test_support::{pull_request_event, push_event, repository_hook, TEST_REPO, TEST_VCS};
use hk_core::{keys, AnalysisStatus, EventStatus, HookId, WorkflowHook};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn push_without_hooks_finishes_done() {
    let ctx = setup();
    ctx.analysis.set_projects(&["PROJ"]);
    let event = push_event("e-1", "main", "abc");
    ctx.submit(&event).await;

    ctx.drain().await;

    let stored = ctx.reload(&event).await;
    assert_eq!(stored.status, EventStatus::Done);
    assert_eq!(stored.analyses[0].status, Some(AnalysisStatus::Succeed));
    assert!(ctx.in_progress().await.is_empty());
}

#[tokio::test]
async fn push_with_hook_triggers_run() {
    let ctx = setup();
    ctx.hooks.add_hook(repository_hook("h-1", "build"));
    let event = push_event("e-1", "main", "abc");
    ctx.submit(&event).await;

    ctx.drain().await;

    let stored = ctx.reload(&event).await;
    assert_eq!(stored.status, EventStatus::Done);
    assert_eq!(stored.workflow_hooks[0].run_id, "run-build-1");
    assert_eq!(ctx.workflows.runs_of("build"), 1);
    assert_eq!(stored.last_update, ctx.clock.epoch_ms());
}

#[tokio::test]
async fn missing_event_is_dropped() {
    let ctx = setup();

    ctx.runtime
        .process_repository_event("hooks:events:repository:github-org/app-gone")
        .await
        .unwrap();

    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 0);
    assert!(ctx.hooks.calls().is_empty());
}

#[tokio::test]
async fn terminal_event_leaves_in_progress_set() {
    let ctx = setup();
    let mut event = push_event("e-1", "main", "abc");
    event.status = EventStatus::Done;
    ctx.submit(&event).await;

    ctx.drain().await;

    assert!(ctx.in_progress().await.is_empty());
    assert!(ctx.hooks.calls().is_empty());
}

#[tokio::test]
async fn locked_event_is_requeued_untouched() {
    let ctx = setup();
    let event = push_event("e-1", "main", "abc");
    ctx.submit(&event).await;
    let lock = keys::repository_event_lock(TEST_VCS, TEST_REPO, "e-1");
    assert!(ctx
        .store
        .lock(&lock, Duration::from_secs(30), Duration::from_millis(1), 0)
        .await
        .unwrap());

    let key = ctx.runtime.events().dequeue(Duration::ZERO).await.unwrap().unwrap();
    ctx.runtime.process_repository_event(&key).await.unwrap();

    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 1);
    assert_eq!(ctx.reload(&event).await.status, EventStatus::Scheduled);
    assert!(ctx.hooks.calls().is_empty());
}

#[tokio::test]
async fn failures_reach_the_ceiling_and_turn_error() {
    let ctx = setup();
    ctx.hooks.set_unavailable(true);
    let event = pull_request_event("e-1", "main", "abc");
    ctx.submit(&event).await;

    let mut seen = Vec::new();
    while let Some(key) = ctx.runtime.events().dequeue(Duration::ZERO).await.unwrap() {
        ctx.runtime.process_repository_event(&key).await.unwrap();
        seen.push(ctx.reload(&event).await.nb_errors);
    }

    assert_eq!(seen, vec![1, 2, 3]);
    let stored = ctx.reload(&event).await;
    assert_eq!(stored.status, EventStatus::Error);
    assert!(stored.last_error.contains("unavailable"));
    assert!(ctx.in_progress().await.is_empty());
}

#[tokio::test]
async fn event_already_at_ceiling_errors_without_work() {
    let ctx = setup();
    let mut event = pull_request_event("e-1", "main", "abc");
    event.nb_errors = 3;
    ctx.submit(&event).await;

    ctx.drain().await;

    assert_eq!(ctx.reload(&event).await.status, EventStatus::Error);
    assert!(ctx.hooks.calls().is_empty());
}

#[tokio::test]
async fn suspended_event_stays_tracked() {
    let ctx = setup();
    ctx.analysis.set_projects(&["PROJ"]);
    ctx.analysis.start_with("PROJ", AnalysisStatus::InProgress);
    let event = push_event("e-1", "main", "abc");
    ctx.submit(&event).await;

    ctx.drain().await;

    assert_eq!(ctx.reload(&event).await.status, EventStatus::Analysis);
    assert_eq!(ctx.in_progress().await, vec![event.key()]);
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 0);
}

#[tokio::test]
async fn restart_resets_counters_and_requeues() {
    let ctx = setup();
    ctx.hooks.set_unavailable(true);
    let event = pull_request_event("e-1", "main", "abc");
    ctx.submit(&event).await;
    ctx.drain().await;
    assert_eq!(ctx.reload(&event).await.status, EventStatus::Error);

    ctx.hooks.set_unavailable(false);
    let restarted = ctx
        .runtime
        .restart_repository_event(TEST_VCS, TEST_REPO, "e-1")
        .await
        .unwrap();
    assert_eq!(restarted.status, EventStatus::Scheduled);
    assert_eq!(restarted.nb_errors, 0);
    assert_eq!(ctx.in_progress().await, vec![event.key()]);

    ctx.drain().await;
    assert_eq!(ctx.reload(&event).await.status, EventStatus::Done);
}

#[tokio::test]
async fn restart_unknown_event_fails() {
    let ctx = setup();

    let err = ctx
        .runtime
        .restart_repository_event(TEST_VCS, TEST_REPO, "nope")
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::EventNotFound(_)));
}

#[tokio::test]
async fn restart_of_locked_event_fails() {
    let ctx = setup();
    let event = pull_request_event("e-1", "main", "abc");
    ctx.submit(&event).await;
    let lock = keys::repository_event_lock(TEST_VCS, TEST_REPO, "e-1");
    ctx.store
        .lock(&lock, Duration::from_secs(30), Duration::from_millis(1), 0)
        .await
        .unwrap();

    let err = ctx
        .runtime
        .restart_repository_event(TEST_VCS, TEST_REPO, "e-1")
        .await
        .unwrap_err();

    assert!(matches!(err, RuntimeError::EventLocked(_)));
}

#[tokio::test]
async fn finished_events_beyond_retention_are_pruned() {
    let ctx = setup_with_config(RuntimeConfig {
        max_events_per_repository: 1,
        ..test_config()
    });
    let mut older = pull_request_event("e-1", "main", "abc");
    older.created = 1_000;
    let mut newer = pull_request_event("e-2", "main", "def");
    newer.created = 2_000;
    ctx.submit(&older).await;
    ctx.submit(&newer).await;

    ctx.drain().await;

    let listed = ctx
        .runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uuid, "e-2");
    assert!(ctx
        .runtime
        .get_repository_event(TEST_VCS, TEST_REPO, "e-1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn event_restarted_after_listing_survives_pruning() {
    let ctx = setup_with_config(RuntimeConfig {
        max_events_per_repository: 1,
        ..test_config()
    });
    let mut older = pull_request_event("e-1", "main", "abc");
    older.created = 1_000;
    let mut newer = pull_request_event("e-2", "main", "def");
    newer.created = 2_000;
    for event in [&older, &newer] {
        let mut event = event.clone();
        event.status = EventStatus::Done;
        ctx.runtime.events().save(&event).await.unwrap();
    }
    let expired = ctx
        .runtime
        .events()
        .expired_events(TEST_VCS, TEST_REPO, 1)
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);

    ctx.runtime
        .restart_repository_event(TEST_VCS, TEST_REPO, "e-1")
        .await
        .unwrap();
    let deleted = ctx.runtime.delete_expired_events(&expired).await.unwrap();

    assert_eq!(deleted, 0);
    assert_eq!(ctx.reload(&older).await.status, EventStatus::Scheduled);
    assert_eq!(ctx.in_progress().await, vec![older.key()]);
    ctx.drain().await;
    assert_eq!(ctx.reload(&older).await.status, EventStatus::Done);
}

#[tokio::test]
async fn expired_event_held_by_another_worker_is_kept() {
    let ctx = setup_with_config(RuntimeConfig {
        max_events_per_repository: 1,
        ..test_config()
    });
    let mut older = pull_request_event("e-1", "main", "abc");
    older.created = 1_000;
    older.status = EventStatus::Done;
    let mut newer = pull_request_event("e-2", "main", "def");
    newer.created = 2_000;
    newer.status = EventStatus::Done;
    ctx.runtime.events().save(&older).await.unwrap();
    ctx.runtime.events().save(&newer).await.unwrap();
    let lock = keys::repository_event_lock(TEST_VCS, TEST_REPO, "e-1");
    assert!(ctx
        .store
        .lock(&lock, Duration::from_secs(30), Duration::from_millis(1), 0)
        .await
        .unwrap());

    let deleted = ctx
        .runtime
        .prune_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();

    assert_eq!(deleted, 0);
    assert!(ctx.runtime.events().get(&older.key()).await.unwrap().is_some());

    ctx.store.unlock(&lock).await.unwrap();
    assert_eq!(
        ctx.runtime
            .prune_repository_events(TEST_VCS, TEST_REPO)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn dispatch_loop_processes_until_cancelled() {
    let ctx = setup();
    let event = pull_request_event("e-1", "main", "abc");
    ctx.submit(&event).await;
    let cancel = CancellationToken::new();

    let (result, ()) = tokio::join!(ctx.runtime.run_dispatch_loop(cancel.clone()), async {
        while ctx.reload(&event).await.status != EventStatus::Done {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();
    });

    result.unwrap();
    assert!(ctx.in_progress().await.is_empty());
}

/// Resolver that panics while checking the repository
#[derive(Clone)]
struct PanickingHooks;

#[async_trait]
impl HookResolver for PanickingHooks {
    async fn repository_status(&self, _: &str, _: &str) -> Result<RepositoryStatus, HookError> {
        panic!("resolver blew up");
    }

    async fn repository_hooks(&self, _: &str, _: &str) -> Result<Vec<WorkflowHook>, HookError> {
        Ok(Vec::new())
    }

    async fn workflow_run_hooks(&self, _: &str, _: &str) -> Result<Vec<WorkflowHook>, HookError> {
        Ok(Vec::new())
    }

    async fn hook(&self, id: &HookId) -> Result<WorkflowHook, HookError> {
        Err(HookError::NotFound(id.to_string()))
    }
}

#[tokio::test]
async fn panic_is_recorded_and_lock_released() {
    let ctx = setup();
    let runtime = Runtime::new(
        RuntimeDeps {
            store: ctx.store.clone(),
            hooks: PanickingHooks,
            analysis: ctx.analysis.clone(),
            signing: ctx.signing.clone(),
            workflows: ctx.workflows.clone(),
        },
        ctx.clock.clone(),
        test_config(),
    );
    let event = pull_request_event("e-1", "main", "abc");
    ctx.submit(&event).await;

    let key = runtime.events().dequeue(Duration::ZERO).await.unwrap().unwrap();
    runtime.process_repository_event(&key).await.unwrap();

    let stored = ctx.reload(&event).await;
    assert_eq!(stored.nb_errors, 1);
    assert!(stored.last_error.contains("resolver blew up"));
    assert_eq!(runtime.events().queue_len().await.unwrap(), 1);
    let lock = keys::repository_event_lock(TEST_VCS, TEST_REPO, "e-1");
    assert!(ctx
        .store
        .lock(&lock, Duration::from_secs(1), Duration::from_millis(1), 0)
        .await
        .unwrap());
}
