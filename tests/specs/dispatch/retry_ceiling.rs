//! Retry ceiling specs
//!
//! Verify that failures are counted, never forgotten, and end in a sticky
//! `Error` after exactly the configured number of attempts.

use crate::prelude::*;
use hk_core::test_support::pull_request_event;
use hk_core::EventStatus;
use hk_engine::RuntimeConfig;
use std::time::Duration;
use yare::parameterized;

#[parameterized(
    one = { 1 },
    three = { 3 },
    five = { 5 },
)]
#[test_macro(tokio::test)]
async fn error_after_exactly_retry_error_failures(retry_error: u32) {
    let world = World::new();
    world.hooks.set_unavailable(true);
    let runtime = world.instance_with(RuntimeConfig {
        retry_error,
        ..spec_config()
    });
    let event = pull_request_event("e-1", "main", "abc");
    runtime.events().create_and_enqueue(&event).await.unwrap();

    drain(&runtime).await;

    let stored = runtime.events().get(&event.key()).await.unwrap().unwrap();
    assert_eq!(stored.status, EventStatus::Error);
    assert_eq!(stored.nb_errors, retry_error);
    assert_eq!(runtime.events().in_progress_count().await.unwrap(), 0);
}

#[tokio::test]
async fn error_count_never_decreases_between_versions() {
    let world = World::new();
    world.hooks.set_unavailable(true);
    let runtime = world.instance();
    let event = pull_request_event("e-1", "main", "abc");
    runtime.events().create_and_enqueue(&event).await.unwrap();

    drain(&runtime).await;

    let counts: Vec<u32> = world
        .store
        .versions(&event.key())
        .iter()
        .map(|v| v.nb_errors)
        .collect();
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "{counts:?}");
    assert_eq!(counts.last(), Some(&3));
}

#[tokio::test]
async fn terminal_events_stay_terminal_through_recovery() {
    let world = World::new();
    world.hooks.set_unavailable(true);
    let runtime = world.instance();
    let event = pull_request_event("e-1", "main", "abc");
    runtime.events().create_and_enqueue(&event).await.unwrap();
    drain(&runtime).await;

    world.hooks.set_unavailable(false);
    // Put it back in the in-progress set, as a crashed finish would leave it
    let stored = runtime.events().get(&event.key()).await.unwrap().unwrap();
    runtime.events().mark_in_progress(&stored).await.unwrap();
    world.clock.advance(Duration::from_secs(3600));
    let report = runtime.recover_stale_events().await.unwrap();
    drain(&runtime).await;

    assert_eq!(report.events_requeued, 0);
    assert_eq!(report.events_dropped, 1);
    let after = runtime.events().get(&event.key()).await.unwrap().unwrap();
    assert_eq!(after.status, EventStatus::Error);
    assert_eq!(after.nb_errors, 3);
    assert!(world.workflows.runs().is_empty());
}
