//! Scheduler firing specs under several instances
//!
//! Verify that instances ticking over the same schedules create each due
//! firing exactly once.

use crate::prelude::*;
use hk_core::test_support::{scheduler_hook, TEST_REPO, TEST_VCS};
use hk_core::EventName;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_scheduler_loops_fire_each_schedule_once() {
    let world = World::new();
    let instances = [world.instance(), world.instance(), world.instance()];
    let hooks = [
        scheduler_hook("h-1", "nightly", "0 * * * *"),
        scheduler_hook("h-2", "nightly", "*/30 * * * *"),
        scheduler_hook("h-3", "nightly", "@daily"),
    ];
    instances[0]
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "nightly", &hooks)
        .await
        .unwrap();
    // h-1 and h-2 are due, h-3 is not
    world.clock.advance(Duration::from_secs(3600));

    let cancel = CancellationToken::new();
    let tasks: Vec<_> = instances
        .iter()
        .map(|rt| {
            let rt = rt.clone();
            let c = cancel.clone();
            tokio::spawn(async move { rt.run_scheduler_loop(c).await })
        })
        .collect();

    let rt = instances[0].clone();
    wait_for("both due schedules fired", || {
        let rt = rt.clone();
        async move { rt.events().queue_len().await.unwrap() >= 2 }
    })
    .await;
    // A few more ticks to give a duplicate the chance to appear
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(instances[0].events().queue_len().await.unwrap(), 2);
    let events = instances[0]
        .list_repository_events(TEST_VCS, TEST_REPO)
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event_name == EventName::Scheduler));
    assert_eq!(world.store.overlaps(), Vec::<String>::new());
}
