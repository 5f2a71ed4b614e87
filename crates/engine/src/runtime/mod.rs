// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime for the hook service

mod cascade;
mod dispatch;
mod handlers;
mod maintenance;
mod recovery;
mod retention;
mod scheduler;

pub use handlers::Step;
pub use recovery::RecoveryReport;
pub use scheduler::SchedulerEntry;

use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::Clock;
use hk_storage::{EventRepository, OutgoingRepository, QueueStats, SchedulerRepository, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Engine tunables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Failed attempts before an event turns `Error`
    pub retry_error: u32,
    /// Age of `last_update` after which a tracked event is re-enqueued
    pub retry_delay: Duration,
    /// Longest wait of a single queue pop
    pub dequeue_timeout: Duration,
    pub lock_ttl: Duration,
    pub lock_retry_interval: Duration,
    pub lock_retry_count: u32,
    pub scheduler_tick: Duration,
    pub recovery_interval: Duration,
    /// Events kept per repository once they are finished
    pub max_events_per_repository: usize,
    /// Run completion records kept per upstream workflow once cascaded
    pub max_outgoing_per_workflow: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            retry_error: 3,
            retry_delay: Duration::from_secs(60),
            dequeue_timeout: Duration::from_millis(250),
            lock_ttl: Duration::from_secs(30),
            lock_retry_interval: Duration::from_millis(100),
            lock_retry_count: 5,
            scheduler_tick: Duration::from_secs(10),
            recovery_interval: Duration::from_secs(60),
            max_events_per_repository: 50,
            max_outgoing_per_workflow: 50,
        }
    }
}

/// Runtime collaborator dependencies
pub struct RuntimeDeps<S, H, A, K, W> {
    pub store: S,
    pub hooks: H,
    pub analysis: A,
    pub signing: K,
    pub workflows: W,
}

/// Drives repository events, scheduler firings and run cascades
pub struct Runtime<S, H, A, K, W, C> {
    pub(crate) store: S,
    pub(crate) events: EventRepository<S>,
    pub(crate) outgoing: OutgoingRepository<S>,
    pub(crate) schedules: SchedulerRepository<S>,
    pub(crate) hooks: H,
    pub(crate) analysis: A,
    pub(crate) signing: K,
    pub(crate) workflows: W,
    pub(crate) clock: C,
    pub(crate) config: RuntimeConfig,
    pub(crate) maintenance: Arc<AtomicBool>,
}

/// Queue and in-progress figures for periodic logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    pub events: QueueStats,
    pub events_queued: usize,
    pub events_in_progress: usize,
    pub outgoing: QueueStats,
    pub outgoing_queued: usize,
    pub outgoing_in_progress: usize,
}

impl<S, H, A, K, W, C> Runtime<S, H, A, K, W, C>
where
    S: Store,
    H: HookResolver,
    A: AnalysisAdapter,
    K: SigningKeyAdapter,
    W: WorkflowRunAdapter,
    C: Clock,
{
    pub fn new(deps: RuntimeDeps<S, H, A, K, W>, clock: C, config: RuntimeConfig) -> Self {
        Self {
            events: EventRepository::new(deps.store.clone()),
            outgoing: OutgoingRepository::new(deps.store.clone()),
            schedules: SchedulerRepository::new(deps.store.clone()),
            store: deps.store,
            hooks: deps.hooks,
            analysis: deps.analysis,
            signing: deps.signing,
            workflows: deps.workflows,
            clock,
            config,
            maintenance: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Repository event records
    pub fn events(&self) -> &EventRepository<S> {
        &self.events
    }

    /// Workflow run completion records
    pub fn outgoing(&self) -> &OutgoingRepository<S> {
        &self.outgoing
    }

    pub fn schedules(&self) -> &SchedulerRepository<S> {
        &self.schedules
    }

    /// Whether dispatch is paused
    pub fn is_maintenance(&self) -> bool {
        self.maintenance.load(Ordering::SeqCst)
    }

    pub async fn stats(&self) -> Result<RuntimeStats, hk_storage::StoreError> {
        Ok(RuntimeStats {
            events: self.events.stats(),
            events_queued: self.events.queue_len().await?,
            events_in_progress: self.events.in_progress_count().await?,
            outgoing: self.outgoing.stats(),
            outgoing_queued: self.outgoing.queue_len().await?,
            outgoing_in_progress: self.outgoing.in_progress_count().await?,
        })
    }

    /// Take an advisory lock with the configured TTL and retries.
    pub(crate) async fn lock(&self, key: &str) -> Result<bool, hk_storage::StoreError> {
        self.store
            .lock(
                key,
                self.config.lock_ttl,
                self.config.lock_retry_interval,
                self.config.lock_retry_count,
            )
            .await
    }

    /// Take an advisory lock with a single attempt.
    pub(crate) async fn try_lock(&self, key: &str) -> Result<bool, hk_storage::StoreError> {
        self.store
            .lock(key, self.config.lock_ttl, self.config.lock_retry_interval, 0)
            .await
    }

    /// Release a lock; failures are logged, the TTL reclaims it anyway.
    pub(crate) async fn unlock(&self, key: &str) {
        if let Err(e) = self.store.unlock(key).await {
            tracing::warn!(lock = key, error = %e, "failed to release lock");
        }
    }
}

#[cfg(test)]
#[path = "../runtime_tests/mod.rs"]
mod tests;
