//! Test helpers for behavioral specifications.
//!
//! Builds worker instances over one shared in-memory store, the way several
//! `hkd` processes share one store in production. The store is wrapped in
//! [`SpecStore`], which watches locks and event record writes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hk_adapters::{
    FakeAnalysisAdapter, FakeHookResolver, FakeSigningKeyAdapter, FakeWorkflowRunAdapter,
};
use hk_core::{keys, FakeClock, HookRepositoryEvent};
use hk_engine::{Runtime, RuntimeConfig, RuntimeDeps};
use hk_storage::{MemoryStore, MemorySubscription, Store, StoreError};
use parking_lot::Mutex;

// Spec polling timeouts
pub const SPEC_POLL_INTERVAL_MS: u64 = 5;
pub const SPEC_WAIT_MAX_MS: u64 = 5000;

const EVENT_PREFIX: &str = "hooks:events:repository:";

pub type SpecRuntime = Runtime<
    SpecStore,
    FakeHookResolver,
    FakeAnalysisAdapter,
    FakeSigningKeyAdapter,
    FakeWorkflowRunAdapter,
    FakeClock,
>;

#[derive(Default)]
struct Watch {
    /// Check event record writes against held locks
    armed: bool,
    held: HashSet<String>,
    /// Locks granted while already held
    overlaps: Vec<String>,
    /// Event record writes made without the event lock
    unguarded: Vec<String>,
    /// Every persisted version of every event record
    versions: HashMap<String, Vec<String>>,
    /// Queue name and how many more enqueues succeed before one fails
    fail_enqueue: Option<(String, usize)>,
}

/// [`MemoryStore`] wrapper recording lock ownership and event writes
#[derive(Clone, Default)]
pub struct SpecStore {
    inner: MemoryStore,
    watch: Arc<Mutex<Watch>>,
}

impl SpecStore {
    /// Start checking that event records are only written under their lock.
    pub fn arm(&self) {
        self.watch.lock().armed = true;
    }

    pub fn overlaps(&self) -> Vec<String> {
        self.watch.lock().overlaps.clone()
    }

    pub fn unguarded_writes(&self) -> Vec<String> {
        self.watch.lock().unguarded.clone()
    }

    /// Decoded versions of the event record at `key`, oldest first
    pub fn versions(&self, key: &str) -> Vec<HookRepositoryEvent> {
        self.watch
            .lock()
            .versions
            .get(key)
            .map(|raw| {
                raw.iter()
                    .map(|r| serde_json::from_str(r).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fail one enqueue on `queue`, after `after` more succeed.
    pub fn fail_enqueue(&self, queue: &str, after: usize) {
        self.watch.lock().fail_enqueue = Some((queue.to_string(), after));
    }

    fn record_write(&self, key: &str, value: &str) {
        if !key.starts_with(EVENT_PREFIX) {
            return;
        }
        let mut watch = self.watch.lock();
        if watch.armed && !watch.held.contains(&keys::repository_event_lock_for_key(key)) {
            watch.unguarded.push(key.to_string());
        }
        watch
            .versions
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    fn should_fail_enqueue(&self, queue: &str) -> bool {
        let mut watch = self.watch.lock();
        let Some((name, after)) = watch.fail_enqueue.as_mut() else {
            return false;
        };
        if name.as_str() != queue {
            return false;
        }
        if *after > 0 {
            *after -= 1;
            return false;
        }
        watch.fail_enqueue = None;
        true
    }
}

#[async_trait]
impl Store for SpecStore {
    type Subscription = MemorySubscription;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.record_write(key, value);
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        self.inner.keys(pattern).await
    }

    async fn enqueue(&self, queue: &str, value: &str) -> Result<(), StoreError> {
        if self.should_fail_enqueue(queue) {
            return Err(StoreError::Unavailable(format!("injected failure on {queue}")));
        }
        self.inner.enqueue(queue, value).await
    }

    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<String>, StoreError> {
        self.inner.dequeue(queue, wait).await
    }

    async fn queue_len(&self, queue: &str) -> Result<usize, StoreError> {
        self.inner.queue_len(queue).await
    }

    async fn set_add(&self, set: &str, member: &str, value: &str) -> Result<(), StoreError> {
        self.record_write(member, value);
        // Widen the window between the write and anything that follows
        tokio::task::yield_now().await;
        self.inner.set_add(set, member, value).await
    }

    async fn set_remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.inner.set_remove(set, member).await
    }

    async fn set_card(&self, set: &str) -> Result<usize, StoreError> {
        self.inner.set_card(set).await
    }

    async fn set_scan(&self, set: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_scan(set).await
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        self.inner.set_members(set).await
    }

    async fn lock(
        &self,
        key: &str,
        ttl: Duration,
        retry_interval: Duration,
        retry_count: u32,
    ) -> Result<bool, StoreError> {
        let granted = self.inner.lock(key, ttl, retry_interval, retry_count).await?;
        if granted {
            let mut watch = self.watch.lock();
            if !watch.held.insert(key.to_string()) {
                watch.overlaps.push(key.to_string());
            }
        }
        Ok(granted)
    }

    async fn unlock(&self, key: &str) -> Result<(), StoreError> {
        self.watch.lock().held.remove(key);
        self.inner.unlock(key).await
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<(), StoreError> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<MemorySubscription, StoreError> {
        self.inner.subscribe(channel).await
    }
}

/// Fast polls; a held lock is given up on at once
pub fn spec_config() -> RuntimeConfig {
    RuntimeConfig {
        dequeue_timeout: Duration::from_millis(10),
        lock_retry_interval: Duration::from_millis(1),
        lock_retry_count: 0,
        scheduler_tick: Duration::from_millis(10),
        recovery_interval: Duration::from_millis(10),
        ..RuntimeConfig::default()
    }
}

/// Shared store, clock and collaborators
#[derive(Clone)]
pub struct World {
    pub store: SpecStore,
    pub clock: FakeClock,
    pub hooks: FakeHookResolver,
    pub analysis: FakeAnalysisAdapter,
    pub signing: FakeSigningKeyAdapter,
    pub workflows: FakeWorkflowRunAdapter,
}

impl World {
    pub fn new() -> Self {
        Self {
            store: SpecStore::default(),
            clock: FakeClock::new(),
            hooks: FakeHookResolver::new(),
            analysis: FakeAnalysisAdapter::new(),
            signing: FakeSigningKeyAdapter::new(),
            workflows: FakeWorkflowRunAdapter::new(),
        }
    }

    /// A worker instance with the scenario config
    pub fn instance(&self) -> Arc<SpecRuntime> {
        self.instance_with(spec_config())
    }

    pub fn instance_with(&self, config: RuntimeConfig) -> Arc<SpecRuntime> {
        Arc::new(Runtime::new(
            RuntimeDeps {
                store: self.store.clone(),
                hooks: self.hooks.clone(),
                analysis: self.analysis.clone(),
                signing: self.signing.clone(),
                workflows: self.workflows.clone(),
            },
            self.clock.clone(),
            config,
        ))
    }
}

/// Process repository events until the queue is empty.
pub async fn drain(runtime: &SpecRuntime) {
    for _ in 0..1000 {
        let Some(key) = runtime.events().dequeue(Duration::ZERO).await.unwrap() else {
            return;
        };
        runtime.process_repository_event(&key).await.unwrap();
    }
    panic!("event queue did not drain");
}

/// Process outgoing events until the queue is empty.
pub async fn drain_outgoing(runtime: &SpecRuntime) {
    for _ in 0..1000 {
        let Some(key) = runtime.outgoing().dequeue(Duration::ZERO).await.unwrap() else {
            return;
        };
        runtime.process_outgoing_event(&key).await.unwrap();
    }
    panic!("outgoing queue did not drain");
}

/// Poll `check` until it holds, panicking after [`SPEC_WAIT_MAX_MS`].
pub async fn wait_for<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(SPEC_WAIT_MAX_MS);
    while !check().await {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
}
