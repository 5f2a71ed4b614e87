// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hk_core::test_support::{repository_hook, workflow_run_hook, TEST_PROJECT, TEST_REPO, TEST_VCS};

#[tokio::test]
async fn hooks_are_filtered_by_repository_and_upstream() {
    let resolver = FakeHookResolver::new();
    resolver.add_hook(repository_hook("h-1", "build"));
    resolver.add_hook(workflow_run_hook("h-2", "deploy", "build"));
    resolver.add_hook(repository_hook("h-3", "other").on_repository(TEST_VCS, "org/other"));

    let repo_hooks = resolver.repository_hooks(TEST_VCS, TEST_REPO).await.unwrap();
    assert_eq!(repo_hooks.len(), 2);

    let downstream = resolver
        .workflow_run_hooks(TEST_PROJECT, "build")
        .await
        .unwrap();
    assert_eq!(downstream.len(), 1);
    assert_eq!(downstream[0].id, "h-2");
}

#[tokio::test]
async fn missing_hook_is_not_found() {
    let resolver = FakeHookResolver::new();
    resolver.add_hook(repository_hook("h-1", "build"));
    resolver.remove_hook("h-1");

    let err = resolver.hook(&HookId::new("h-1")).await.unwrap_err();
    assert!(matches!(err, HookError::NotFound(id) if id == "h-1"));
}

#[tokio::test]
async fn stopped_repository_and_outage_are_reported() {
    let resolver = FakeHookResolver::new();
    resolver.stop_repository(TEST_VCS, TEST_REPO);
    assert_eq!(
        resolver.repository_status(TEST_VCS, TEST_REPO).await.unwrap(),
        RepositoryStatus::Stopped
    );

    resolver.set_unavailable(true);
    assert!(matches!(
        resolver.repository_status(TEST_VCS, TEST_REPO).await,
        Err(HookError::Unavailable(_))
    ));
    assert_eq!(resolver.calls().len(), 2);
}
