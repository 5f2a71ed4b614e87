//! Scheduler replacement specs
//!
//! Verify that instantiating a workflow's schedules replaces the previous
//! set wholesale.

use crate::prelude::*;
use hk_core::test_support::{scheduler_hook, TEST_REPO, TEST_VCS};
use hk_core::WorkflowHook;
use yare::parameterized;

fn hooks(ids: &[&str]) -> Vec<WorkflowHook> {
    ids.iter()
        .map(|id| scheduler_hook(id, "nightly", "0 * * * *"))
        .collect()
}

#[parameterized(
    shrink = { &["h-1", "h-2", "h-3"], &["h-4", "h-5"] },
    grow = { &["h-1"], &["h-1", "h-2", "h-3", "h-4"] },
    overlap = { &["h-1", "h-2"], &["h-2", "h-3"] },
    clear = { &["h-1", "h-2"], &[] },
)]
#[test_macro(tokio::test)]
async fn replacement_leaves_exactly_the_new_set(before: &[&str], after: &[&str]) {
    let world = World::new();
    let runtime = world.instance();
    runtime
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "nightly", &hooks(before))
        .await
        .unwrap();

    let stored = runtime
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "nightly", &hooks(after))
        .await
        .unwrap();

    assert_eq!(stored, after.len());
    let mut ids: Vec<String> = runtime
        .list_schedulers(TEST_VCS, TEST_REPO, "nightly")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.definition.id.to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, after);
    assert_eq!(runtime.schedules().executions().await.unwrap().len(), after.len());
    assert_eq!(
        runtime.schedules().all_definitions().await.unwrap().len(),
        after.len()
    );
}

#[tokio::test]
async fn other_workflows_keep_their_schedules() {
    let world = World::new();
    let runtime = world.instance();
    runtime
        .instantiate_scheduler(
            TEST_VCS,
            TEST_REPO,
            "weekly",
            &[scheduler_hook("w-1", "weekly", "0 0 * * 0")],
        )
        .await
        .unwrap();
    runtime
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "nightly", &hooks(&["h-1"]))
        .await
        .unwrap();

    runtime
        .instantiate_scheduler(TEST_VCS, TEST_REPO, "nightly", &hooks(&["h-2"]))
        .await
        .unwrap();

    let weekly = runtime
        .list_schedulers(TEST_VCS, TEST_REPO, "weekly")
        .await
        .unwrap();
    assert_eq!(weekly.len(), 1);
    assert_eq!(runtime.schedules().executions().await.unwrap().len(), 2);
}
