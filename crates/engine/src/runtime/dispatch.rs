// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository event dispatch.
//!
//! Workers pop event keys from the shared queue and drive each event under
//! its per-event lock until it finishes, suspends or fails. Any number of
//! workers, in any number of processes, may run this loop concurrently.

use super::{Runtime, Step};
use crate::error::{RuntimeError, TransitionError};
use futures::FutureExt;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{keys, Clock, EventStatus, HookRepositoryEvent};
use hk_storage::Store;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio_util::sync::CancellationToken;

impl<S, H, A, K, W, C> Runtime<S, H, A, K, W, C>
where
    S: Store,
    H: HookResolver,
    A: AnalysisAdapter,
    K: SigningKeyAdapter,
    W: WorkflowRunAdapter,
    C: Clock,
{
    /// Pop and process repository events until `cancel` fires.
    ///
    /// Paused while maintenance is on. Store failures end the loop.
    pub async fn run_dispatch_loop(&self, cancel: CancellationToken) -> Result<(), RuntimeError> {
        tracing::info!("repository event dispatch started");
        while !cancel.is_cancelled() {
            if self.is_maintenance() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.dequeue_timeout) => continue,
                }
            }
            // Bounded pop so cancellation is seen between waits
            let Some(key) = self.events.dequeue(self.config.dequeue_timeout).await? else {
                continue;
            };
            self.process_repository_event(&key).await?;
        }
        tracing::info!("repository event dispatch stopped");
        Ok(())
    }

    /// Process one queued event key.
    ///
    /// Missing events are dropped, terminal ones leave the in-progress set,
    /// and an event locked by another worker is queued again.
    pub async fn process_repository_event(&self, key: &str) -> Result<(), RuntimeError> {
        let Some(event) = self.events.get(key).await? else {
            tracing::debug!(event = key, "event no longer exists, dropped");
            return Ok(());
        };
        if event.is_terminal() {
            self.events.remove_in_progress(key).await?;
            return Ok(());
        }

        let lock = keys::repository_event_lock_for_key(key);
        if !self.lock(&lock).await? {
            tracing::debug!(event = key, "event locked elsewhere, requeued");
            self.events.enqueue(key).await?;
            return Ok(());
        }
        let result = self.process_locked(key).await;
        self.unlock(&lock).await;
        result
    }

    async fn process_locked(&self, key: &str) -> Result<(), RuntimeError> {
        // Reload: another worker may have moved it while we waited on the lock
        let Some(mut event) = self.events.get(key).await? else {
            return Ok(());
        };
        if event.is_terminal() {
            self.events.remove_in_progress(key).await?;
            return Ok(());
        }
        if event.nb_errors >= self.config.retry_error {
            event.status = EventStatus::Error;
            event.last_update = self.clock.epoch_ms();
            self.events.save(&event).await?;
            tracing::warn!(event = key, nb_errors = event.nb_errors, "retry ceiling reached");
            return self.finish(&event).await;
        }

        loop {
            let outcome = AssertUnwindSafe(self.advance(&mut event))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(TransitionError::Panicked(panic_message(&*panic))));
            event.last_update = self.clock.epoch_ms();

            match outcome {
                Ok(step) => {
                    self.events.save(&event).await?;
                    if event.is_terminal() {
                        return self.finish(&event).await;
                    }
                    if step == Step::Suspend {
                        tracing::debug!(event = key, status = %event.status, "event suspended");
                        return Ok(());
                    }
                }
                Err(e) => {
                    event.record_error(e.to_string());
                    tracing::warn!(
                        event = key,
                        status = %event.status,
                        nb_errors = event.nb_errors,
                        error = %e,
                        "event transition failed"
                    );
                    if event.nb_errors >= self.config.retry_error {
                        event.status = EventStatus::Error;
                        self.events.save(&event).await?;
                        return self.finish(&event).await;
                    }
                    self.events.save(&event).await?;
                    self.events.enqueue(key).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Untrack a terminal event and apply repository retention.
    async fn finish(&self, event: &HookRepositoryEvent) -> Result<(), RuntimeError> {
        let key = event.key();
        self.events.remove_in_progress(&key).await?;
        tracing::info!(
            event = %key,
            status = %event.status,
            last_error = %event.last_error,
            "event finished"
        );
        self.prune_repository_events(&event.vcs_server_name, &event.repository_name)
            .await?;
        Ok(())
    }

    /// Put an event back to `Scheduled` with fresh error counters and queue it.
    pub async fn restart_repository_event(
        &self,
        vcs: &str,
        repo: &str,
        uuid: &str,
    ) -> Result<HookRepositoryEvent, RuntimeError> {
        let key = keys::repository_event(vcs, repo, uuid);
        let lock = keys::repository_event_lock(vcs, repo, uuid);
        if !self.lock(&lock).await? {
            return Err(RuntimeError::EventLocked(key));
        }
        let result = self.restart_locked(&key).await;
        self.unlock(&lock).await;
        result
    }

    async fn restart_locked(&self, key: &str) -> Result<HookRepositoryEvent, RuntimeError> {
        let mut event = self
            .events
            .get(key)
            .await?
            .ok_or_else(|| RuntimeError::EventNotFound(key.to_string()))?;
        event.restart();
        event.last_update = self.clock.epoch_ms();
        self.events.save(&event).await?;
        self.events.mark_in_progress(&event).await?;
        self.events.enqueue(key).await?;
        tracing::info!(event = key, "event restarted");
        Ok(event)
    }

    pub async fn get_repository_event(
        &self,
        vcs: &str,
        repo: &str,
        uuid: &str,
    ) -> Result<Option<HookRepositoryEvent>, RuntimeError> {
        Ok(self.events.get_repository_event(vcs, repo, uuid).await?)
    }

    /// Events of one repository, newest first
    pub async fn list_repository_events(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<Vec<HookRepositoryEvent>, RuntimeError> {
        Ok(self.events.list_repository_events(vcs, repo).await?)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
