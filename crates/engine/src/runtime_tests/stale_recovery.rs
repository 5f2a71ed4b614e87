// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Re-enqueueing of stale in-progress events

use super::*;
use hk_core::test_support::{pull_request_event, push_event, run_completion, TEST_REPO, TEST_VCS};
use hk_core::{keys, AnalysisStatus, EventStatus};
use yare::parameterized;

/// Submit an event and pop it, as a worker that died mid-way would
async fn orphan(ctx: &TestContext, event: &HookRepositoryEvent) {
    ctx.submit(event).await;
    ctx.runtime.events().dequeue(Duration::ZERO).await.unwrap();
}

#[parameterized(
    fresh = { 30, 0 },
    exactly_at_delay = { 60, 0 },
    stale = { 61, 1 },
)]
#[test_macro(tokio::test)]
async fn requeues_only_past_retry_delay(age_secs: u64, requeued: usize) {
    let ctx = setup();
    let event = pull_request_event("e-1", "main", "abc");
    orphan(&ctx, &event).await;
    ctx.clock.advance(Duration::from_secs(age_secs));

    let report = ctx.runtime.recover_stale_events().await.unwrap();

    assert_eq!(report.events_requeued, requeued);
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), requeued);
}

#[tokio::test]
async fn requeue_bumps_last_update() {
    let ctx = setup();
    let event = pull_request_event("e-1", "main", "abc");
    orphan(&ctx, &event).await;
    ctx.clock.advance(Duration::from_secs(61));

    ctx.runtime.recover_stale_events().await.unwrap();

    assert_eq!(ctx.reload(&event).await.last_update, ctx.clock.epoch_ms());
    // A second sweep right away finds nothing stale
    let report = ctx.runtime.recover_stale_events().await.unwrap();
    assert_eq!(report.events_requeued, 0);
}

#[tokio::test]
async fn terminal_events_are_untracked_not_requeued() {
    let ctx = setup();
    let mut event = pull_request_event("e-1", "main", "abc");
    event.status = EventStatus::Skipped;
    orphan(&ctx, &event).await;
    ctx.clock.advance(Duration::from_secs(3600));

    let report = ctx.runtime.recover_stale_events().await.unwrap();

    assert_eq!(report.events_dropped, 1);
    assert_eq!(report.events_requeued, 0);
    assert!(ctx.in_progress().await.is_empty());
    assert_eq!(ctx.reload(&event).await.status, EventStatus::Skipped);
}

#[tokio::test]
async fn missing_records_are_untracked() {
    let ctx = setup();
    let event = pull_request_event("e-1", "main", "abc");
    orphan(&ctx, &event).await;
    ctx.store.delete(&event.key()).await.unwrap();

    let report = ctx.runtime.recover_stale_events().await.unwrap();

    assert_eq!(report.events_dropped, 1);
    assert!(ctx.in_progress().await.is_empty());
}

#[tokio::test]
async fn locked_events_are_left_alone() {
    let ctx = setup();
    let event = pull_request_event("e-1", "main", "abc");
    orphan(&ctx, &event).await;
    ctx.clock.advance(Duration::from_secs(61));
    ctx.store
        .lock(
            &keys::repository_event_lock(TEST_VCS, TEST_REPO, "e-1"),
            Duration::from_secs(30),
            Duration::from_millis(1),
            0,
        )
        .await
        .unwrap();

    let report = ctx.runtime.recover_stale_events().await.unwrap();

    assert_eq!(report, RecoveryReport::default());
    assert_eq!(ctx.runtime.events().queue_len().await.unwrap(), 0);
}

#[tokio::test]
async fn suspended_analysis_resumes_after_recovery() {
    let ctx = setup();
    ctx.analysis.set_projects(&["PROJ"]);
    ctx.analysis.start_with("PROJ", AnalysisStatus::InProgress);
    let event = push_event("e-1", "main", "abc");
    ctx.submit(&event).await;
    ctx.drain().await;
    assert_eq!(ctx.reload(&event).await.status, EventStatus::Analysis);

    ctx.analysis.complete("analysis-PROJ-abc", AnalysisStatus::Succeed);
    ctx.clock.advance(Duration::from_secs(61));
    ctx.runtime.recover_stale_events().await.unwrap();
    ctx.drain().await;

    assert_eq!(ctx.reload(&event).await.status, EventStatus::Done);
    assert_eq!(ctx.analysis.started("PROJ"), 1);
    assert!(ctx.in_progress().await.is_empty());
}

#[tokio::test]
async fn stale_outgoing_events_are_requeued() {
    let ctx = setup();
    ctx.runtime
        .notify_run_completed(run_completion("build", "r-1"))
        .await
        .unwrap();
    ctx.runtime.outgoing().dequeue(Duration::ZERO).await.unwrap();
    ctx.clock.advance(Duration::from_secs(61));

    let report = ctx.runtime.recover_stale_events().await.unwrap();

    assert_eq!(report.outgoing_requeued, 1);
    assert_eq!(ctx.runtime.outgoing().queue_len().await.unwrap(), 1);
}
