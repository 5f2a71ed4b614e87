// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime tests

mod cascading;
mod dispatch_loop;
mod maintenance_mode;
mod scheduling;
mod stale_recovery;
mod transitions;

use super::*;
use hk_adapters::{
    FakeAnalysisAdapter, FakeHookResolver, FakeSigningKeyAdapter, FakeWorkflowRunAdapter,
};
use hk_core::{FakeClock, HookRepositoryEvent};
use hk_storage::MemoryStore;

type TestRuntime = Runtime<
    MemoryStore,
    FakeHookResolver,
    FakeAnalysisAdapter,
    FakeSigningKeyAdapter,
    FakeWorkflowRunAdapter,
    FakeClock,
>;

/// Test context holding the runtime and handles on its collaborators
struct TestContext {
    runtime: TestRuntime,
    store: MemoryStore,
    clock: FakeClock,
    hooks: FakeHookResolver,
    analysis: FakeAnalysisAdapter,
    signing: FakeSigningKeyAdapter,
    workflows: FakeWorkflowRunAdapter,
}

/// Fast polls; a held lock is given up on at once
fn test_config() -> RuntimeConfig {
    RuntimeConfig {
        dequeue_timeout: Duration::from_millis(10),
        lock_retry_interval: Duration::from_millis(1),
        lock_retry_count: 0,
        ..RuntimeConfig::default()
    }
}

fn setup() -> TestContext {
    setup_with_config(test_config())
}

fn setup_with_config(config: RuntimeConfig) -> TestContext {
    setup_with_store(MemoryStore::new(), FakeClock::new(), config)
}

/// An instance over `store` and `clock`; pass shared ones to model a
/// second worker process.
fn setup_with_store(store: MemoryStore, clock: FakeClock, config: RuntimeConfig) -> TestContext {
    let hooks = FakeHookResolver::new();
    let analysis = FakeAnalysisAdapter::new();
    let signing = FakeSigningKeyAdapter::new();
    let workflows = FakeWorkflowRunAdapter::new();
    let runtime = Runtime::new(
        RuntimeDeps {
            store: store.clone(),
            hooks: hooks.clone(),
            analysis: analysis.clone(),
            signing: signing.clone(),
            workflows: workflows.clone(),
        },
        clock.clone(),
        config,
    );
    TestContext {
        runtime,
        store,
        clock,
        hooks,
        analysis,
        signing,
        workflows,
    }
}

impl TestContext {
    async fn submit(&self, event: &HookRepositoryEvent) {
        self.runtime.events().create_and_enqueue(event).await.unwrap();
    }

    async fn reload(&self, event: &HookRepositoryEvent) -> HookRepositoryEvent {
        self.runtime
            .events()
            .get(&event.key())
            .await
            .unwrap()
            .unwrap()
    }

    async fn in_progress(&self) -> Vec<String> {
        self.runtime.events().in_progress_keys().await.unwrap()
    }

    /// Process queued repository events until the queue is empty.
    async fn drain(&self) {
        for _ in 0..100 {
            let Some(key) = self.runtime.events().dequeue(Duration::ZERO).await.unwrap() else {
                return;
            };
            self.runtime.process_repository_event(&key).await.unwrap();
        }
        panic!("repository queue did not drain");
    }

    /// Process queued outgoing events until the queue is empty.
    async fn drain_outgoing(&self) {
        for _ in 0..100 {
            let Some(key) = self.runtime.outgoing().dequeue(Duration::ZERO).await.unwrap() else {
                return;
            };
            self.runtime.process_outgoing_event(&key).await.unwrap();
        }
        panic!("outgoing queue did not drain");
    }
}
