// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale event recovery.
//!
//! Events leave the queue while they are processed, so a worker that dies
//! mid-way, or an event suspended on a collaborator, is only found again
//! through the in-progress sets. The sweep re-enqueues tracked events that
//! have not been touched for `retry_delay`.

use super::Runtime;
use crate::error::RuntimeError;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{keys, Clock};
use hk_storage::Store;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Outcome of one recovery sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub events_requeued: usize,
    /// Missing or terminal records removed from the in-progress set
    pub events_dropped: usize,
    pub outgoing_requeued: usize,
    pub outgoing_dropped: usize,
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
    pub async fn recover_stale_events(&self) -> Result<RecoveryReport, RuntimeError> {
        let mut report = RecoveryReport::default();

        for key in self.events.in_progress_keys().await? {
            let live = self.events.get(&key).await?.is_some_and(|e| !e.is_terminal());
            if !live {
                self.events.remove_in_progress(&key).await?;
                report.events_dropped += 1;
                continue;
            }
            let lock = keys::repository_event_lock_for_key(&key);
            // Held means a worker is on it right now
            if !self.try_lock(&lock).await? {
                continue;
            }
            let result = self.requeue_stale_event(&key).await;
            self.unlock(&lock).await;
            if result? {
                report.events_requeued += 1;
            }
        }

        for key in self.outgoing.in_progress_keys().await? {
            let live = self.outgoing.get(&key).await?.is_some_and(|e| !e.is_terminal());
            if !live {
                self.outgoing.remove_in_progress(&key).await?;
                report.outgoing_dropped += 1;
                continue;
            }
            let lock = keys::outgoing_event_lock_for_key(&key);
            if !self.try_lock(&lock).await? {
                continue;
            }
            let result = self.requeue_stale_outgoing(&key).await;
            self.unlock(&lock).await;
            if result? {
                report.outgoing_requeued += 1;
            }
        }

        if report != RecoveryReport::default() {
            tracing::info!(
                events_requeued = report.events_requeued,
                events_dropped = report.events_dropped,
                outgoing_requeued = report.outgoing_requeued,
                outgoing_dropped = report.outgoing_dropped,
                "recovery sweep"
            );
        }
        Ok(report)
    }

    async fn requeue_stale_event(&self, key: &str) -> Result<bool, RuntimeError> {
        let Some(mut event) = self.events.get(key).await? else {
            return Ok(false);
        };
        if event.is_terminal() || !self.is_stale(event.last_update) {
            return Ok(false);
        }
        event.last_update = self.clock.epoch_ms();
        self.events.save(&event).await?;
        self.events.enqueue(key).await?;
        tracing::debug!(event = key, status = %event.status, "stale event requeued");
        Ok(true)
    }

    async fn requeue_stale_outgoing(&self, key: &str) -> Result<bool, RuntimeError> {
        let Some(mut event) = self.outgoing.get(key).await? else {
            return Ok(false);
        };
        if event.is_terminal() || !self.is_stale(event.last_update) {
            return Ok(false);
        }
        event.last_update = self.clock.epoch_ms();
        self.outgoing.save(&event).await?;
        self.outgoing.enqueue(key).await?;
        tracing::debug!(outgoing = key, "stale outgoing event requeued");
        Ok(true)
    }

    fn is_stale(&self, last_update: u64) -> bool {
        let age = self.clock.epoch_ms().saturating_sub(last_update);
        u128::from(age) > self.config.retry_delay.as_millis()
    }

    /// Sweep every `recovery_interval` until `cancel` fires.
    pub async fn run_recovery_loop(&self, cancel: CancellationToken) -> Result<(), RuntimeError> {
        let mut tick = tokio::time::interval(self.config.recovery_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    self.recover_stale_events().await?;
                }
            }
        }
        Ok(())
    }
}
