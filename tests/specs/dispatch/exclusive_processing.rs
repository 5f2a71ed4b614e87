//! Exclusive processing specs
//!
//! Verify that several worker instances, each running several dispatch
//! loops over one queue, never process the same event at the same time,
//! even when its key sits in the queue more than once.

use crate::prelude::*;
use hk_core::test_support::{pull_request_event, repository_hook};
use hk_core::EventStatus;
use tokio_util::sync::CancellationToken;

const EVENTS: usize = 20;
const LOOPS_PER_INSTANCE: usize = 3;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn events_are_processed_by_one_worker_at_a_time() {
    let world = World::new();
    world.hooks.add_hook(repository_hook("h-1", "build"));
    let instances = [world.instance(), world.instance()];

    let mut keys = Vec::new();
    for i in 0..EVENTS {
        let event = pull_request_event(&format!("e-{i}"), "main", &format!("c{i}"));
        instances[0].events().create_and_enqueue(&event).await.unwrap();
        // Duplicate queue entries, as left behind by recovery sweeps
        instances[0].events().enqueue(&event.key()).await.unwrap();
        instances[1].events().enqueue(&event.key()).await.unwrap();
        keys.push(event.key());
    }
    world.store.arm();

    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();
    for runtime in &instances {
        for _ in 0..LOOPS_PER_INSTANCE {
            let rt = runtime.clone();
            let c = cancel.clone();
            tasks.push(tokio::spawn(async move { rt.run_dispatch_loop(c).await }));
        }
    }

    let rt = instances[0].clone();
    wait_for("all events done and queue empty", || {
        let rt = rt.clone();
        let keys = keys.clone();
        async move {
            for key in &keys {
                let status = rt.events().get(key).await.unwrap().map(|e| e.status);
                if status != Some(EventStatus::Done) {
                    return false;
                }
            }
            rt.events().queue_len().await.unwrap() == 0
        }
    })
    .await;
    cancel.cancel();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(world.store.overlaps().is_empty(), "{:?}", world.store.overlaps());
    assert!(
        world.store.unguarded_writes().is_empty(),
        "{:?}",
        world.store.unguarded_writes()
    );
    assert_eq!(world.workflows.runs_of("build"), EVENTS);
    assert_eq!(instances[1].events().in_progress_count().await.unwrap(), 0);
}
