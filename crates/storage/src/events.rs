// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository event persistence.
//!
//! Events live at their own key and are indexed per repository. While an
//! event is being driven through its lifecycle its key is also a member of
//! the in-progress set, which the recovery sweep walks after a crash.

use crate::store::{Store, StoreError, StoreExt};
use hk_core::{keys, HookRepositoryEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Snapshot of queue traffic since start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

impl Counters {
    pub(crate) fn enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
        }
    }
}

/// Typed access to [`HookRepositoryEvent`] records
#[derive(Clone)]
pub struct EventRepository<S> {
    store: S,
    counters: Arc<Counters>,
}

impl<S: Store> EventRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            counters: Arc::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    pub async fn get(&self, key: &str) -> Result<Option<HookRepositoryEvent>, StoreError> {
        self.store.get_json(key).await
    }

    pub async fn get_repository_event(
        &self,
        vcs: &str,
        repo: &str,
        uuid: &str,
    ) -> Result<Option<HookRepositoryEvent>, StoreError> {
        self.get(&keys::repository_event(vcs, repo, uuid)).await
    }

    /// Persist the event and index it under its repository.
    pub async fn save(&self, event: &HookRepositoryEvent) -> Result<(), StoreError> {
        let index = keys::repository_events_index(&event.vcs_server_name, &event.repository_name);
        self.store.set_add_json(&index, &event.key(), event).await
    }

    /// Events of one repository, newest first
    pub async fn list_repository_events(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<Vec<HookRepositoryEvent>, StoreError> {
        let index = keys::repository_events_index(vcs, repo);
        let mut events: Vec<HookRepositoryEvent> = self.store.set_scan_json(&index).await?;
        events.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(events)
    }

    pub async fn delete(&self, event: &HookRepositoryEvent) -> Result<(), StoreError> {
        let key = event.key();
        let index = keys::repository_events_index(&event.vcs_server_name, &event.repository_name);
        self.store.set_remove(&index, &key).await?;
        self.store
            .set_remove(keys::REPOSITORY_EVENT_IN_PROGRESS, &key)
            .await?;
        self.store.delete(&key).await
    }

    /// Track the event as in progress. Also writes the record.
    pub async fn mark_in_progress(&self, event: &HookRepositoryEvent) -> Result<(), StoreError> {
        self.store
            .set_add_json(keys::REPOSITORY_EVENT_IN_PROGRESS, &event.key(), event)
            .await
    }

    pub async fn remove_in_progress(&self, key: &str) -> Result<(), StoreError> {
        self.store
            .set_remove(keys::REPOSITORY_EVENT_IN_PROGRESS, key)
            .await
    }

    pub async fn in_progress_keys(&self) -> Result<Vec<String>, StoreError> {
        self.store
            .set_members(keys::REPOSITORY_EVENT_IN_PROGRESS)
            .await
    }

    pub async fn in_progress_count(&self) -> Result<usize, StoreError> {
        self.store.set_card(keys::REPOSITORY_EVENT_IN_PROGRESS).await
    }

    pub async fn enqueue(&self, key: &str) -> Result<(), StoreError> {
        self.store
            .enqueue(keys::REPOSITORY_EVENT_QUEUE, key)
            .await?;
        self.counters.enqueued();
        Ok(())
    }

    pub async fn dequeue(&self, wait: Duration) -> Result<Option<String>, StoreError> {
        let key = self
            .store
            .dequeue(keys::REPOSITORY_EVENT_QUEUE, wait)
            .await?;
        if key.is_some() {
            self.counters.dequeued();
        }
        Ok(key)
    }

    pub async fn queue_len(&self) -> Result<usize, StoreError> {
        self.store.queue_len(keys::REPOSITORY_EVENT_QUEUE).await
    }

    /// Save a new event, track it and queue it for dispatch.
    pub async fn create_and_enqueue(&self, event: &HookRepositoryEvent) -> Result<(), StoreError> {
        // Tracked first: a record that exists is always reachable by recovery
        self.mark_in_progress(event).await?;
        self.save(event).await?;
        self.enqueue(&event.key()).await?;
        tracing::info!(
            event = %event.key(),
            name = %event.event_name,
            "repository event created"
        );
        Ok(())
    }

    /// Queue an event unless a previous attempt already created it.
    ///
    /// An existing record that is not terminal is queued again, since the
    /// earlier attempt may have failed between saving and queueing. Returns
    /// whether the record was created.
    pub async fn create_or_requeue(&self, event: &HookRepositoryEvent) -> Result<bool, StoreError> {
        let key = event.key();
        match self.get(&key).await? {
            None => {
                self.create_and_enqueue(event).await?;
                Ok(true)
            }
            Some(existing) if !existing.is_terminal() => {
                self.enqueue(&key).await?;
                tracing::debug!(event = %key, "repository event requeued");
                Ok(false)
            }
            Some(_) => Ok(false),
        }
    }

    /// Terminal events of a repository beyond the `keep` newest.
    ///
    /// Events still in flight are never returned, but they count toward
    /// `keep`. The result is a snapshot: callers delete under the event lock.
    pub async fn expired_events(
        &self,
        vcs: &str,
        repo: &str,
        keep: usize,
    ) -> Result<Vec<HookRepositoryEvent>, StoreError> {
        let events = self.list_repository_events(vcs, repo).await?;
        Ok(events
            .into_iter()
            .skip(keep)
            .filter(|e| e.is_terminal())
            .collect())
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
