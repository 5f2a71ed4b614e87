//! Push event flow specs
//!
//! Verify the path of a push through analysis and hook resolution.

use crate::prelude::*;
use hk_core::test_support::{push_event, TEST_PROJECT};
use hk_core::{AnalysisStatus, EventStatus};
use hk_engine::Step;

#[tokio::test]
async fn push_with_one_succeeded_analysis_moves_to_workflow_hooks() {
    let world = World::new();
    world.analysis.set_projects(&[TEST_PROJECT]);
    world.analysis.start_with(TEST_PROJECT, AnalysisStatus::Succeed);
    let runtime = world.instance();
    let mut event = push_event("e-1", "main", "abc");

    let step = runtime.advance(&mut event).await.unwrap();
    assert_eq!(step, Step::Continue);
    assert_eq!(event.status, EventStatus::Analysis);

    let step = runtime.advance(&mut event).await.unwrap();
    assert_eq!(step, Step::Continue);
    assert_eq!(event.status, EventStatus::WorkflowHooks);
    assert_eq!(event.analyses.len(), 1);
    assert_eq!(event.analyses[0].status, Some(AnalysisStatus::Succeed));
}

#[tokio::test]
async fn push_matching_no_hooks_is_done_and_untracked() {
    let world = World::new();
    world.analysis.set_projects(&[TEST_PROJECT]);
    let runtime = world.instance();
    let event = push_event("e-1", "main", "abc");
    runtime.events().create_and_enqueue(&event).await.unwrap();

    drain(&runtime).await;

    let statuses: Vec<EventStatus> = world
        .store
        .versions(&event.key())
        .iter()
        .map(|v| v.status)
        .collect();
    assert_eq!(statuses.first(), Some(&EventStatus::Scheduled));
    assert_eq!(statuses.last(), Some(&EventStatus::Done));
    assert!(!statuses.contains(&EventStatus::Workflow));
    assert_eq!(runtime.events().in_progress_count().await.unwrap(), 0);
    assert!(world.workflows.runs().is_empty());
}
