//! Cascade resumption specs
//!
//! Verify that a cascade interrupted half way resumes without creating
//! duplicate downstream events, and that an event it stored but failed to
//! queue is queued by the retry.

use crate::prelude::*;
use hk_core::test_support::{run_completion, workflow_run_hook, TEST_REPO, TEST_VCS};
use hk_core::{keys, EventStatus, HookStatus, OutgoingStatus};
use std::time::Duration;

#[tokio::test]
async fn interrupted_cascade_resumes_without_duplicates() {
    let world = World::new();
    world.hooks.add_hook(workflow_run_hook("h-1", "deploy", "build"));
    world.hooks.add_hook(workflow_run_hook("h-2", "notify", "build"));
    let runtime = world.instance();
    let outgoing = runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();
    // The second downstream event is stored but its first enqueue fails
    world.store.fail_enqueue(keys::REPOSITORY_EVENT_QUEUE, 1);

    drain_outgoing(&runtime).await;

    let stored = runtime.outgoing().get(&outgoing.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, OutgoingStatus::Done);
    assert_eq!(stored.nb_errors, 1);
    assert!(stored
        .hooks_to_triggers
        .iter()
        .all(|h| h.status == HookStatus::Done));
    let events = runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    // The retry queued the stored event instead of leaving it to recovery
    assert_eq!(runtime.events().queue_len().await.unwrap(), 2);
    assert_eq!(runtime.events().in_progress_count().await.unwrap(), 2);

    drain(&runtime).await;
    world.clock.advance(Duration::from_secs(61));
    let report = runtime.recover_stale_events().await.unwrap();
    assert_eq!(report.events_requeued, 0);

    let events = runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.status == EventStatus::Done));
    assert_eq!(world.workflows.runs_of("deploy"), 1);
    assert_eq!(world.workflows.runs_of("notify"), 1);
    assert_eq!(runtime.events().in_progress_count().await.unwrap(), 0);
}

#[tokio::test]
async fn repeated_completion_notices_cascade_once() {
    let world = World::new();
    world.hooks.add_hook(workflow_run_hook("h-1", "deploy", "build"));
    let runtime = world.instance();

    for _ in 0..3 {
        runtime
            .notify_run_completed(run_completion("build", "r-1"))
            .await
            .unwrap();
    }
    drain_outgoing(&runtime).await;
    drain(&runtime).await;

    let events = runtime
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(world.workflows.runs_of("deploy"), 1);
}
