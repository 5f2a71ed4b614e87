// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outgoing (workflow run completion) event persistence

use crate::events::{Counters, QueueStats};
use crate::store::{Store, StoreError, StoreExt};
use hk_core::{keys, HookWorkflowRunOutgoingEvent};
use std::sync::Arc;
use std::time::Duration;

/// Typed access to [`HookWorkflowRunOutgoingEvent`] records
#[derive(Clone)]
pub struct OutgoingRepository<S> {
    store: S,
    counters: Arc<Counters>,
}

impl<S: Store> OutgoingRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            counters: Arc::default(),
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.counters.snapshot()
    }

    pub async fn get(&self, key: &str) -> Result<Option<HookWorkflowRunOutgoingEvent>, StoreError> {
        self.store.get_json(key).await
    }

    /// Persist the event and index it under its upstream workflow.
    pub async fn save(&self, event: &HookWorkflowRunOutgoingEvent) -> Result<(), StoreError> {
        let index = keys::outgoing_events_index(&event.run.project_key, &event.run.workflow_name);
        self.store.set_add_json(&index, &event.key(), event).await
    }

    /// Outgoing events of one upstream workflow, newest first
    pub async fn list_workflow_events(
        &self,
        project: &str,
        workflow: &str,
    ) -> Result<Vec<HookWorkflowRunOutgoingEvent>, StoreError> {
        let index = keys::outgoing_events_index(project, workflow);
        let mut events: Vec<HookWorkflowRunOutgoingEvent> =
            self.store.set_scan_json(&index).await?;
        events.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(events)
    }

    pub async fn delete(&self, event: &HookWorkflowRunOutgoingEvent) -> Result<(), StoreError> {
        let key = event.key();
        let index = keys::outgoing_events_index(&event.run.project_key, &event.run.workflow_name);
        self.store.set_remove(&index, &key).await?;
        self.store
            .set_remove(keys::OUTGOING_EVENT_IN_PROGRESS, &key)
            .await?;
        self.store.delete(&key).await
    }

    /// Terminal events of a workflow beyond the `keep` newest, as a snapshot
    pub async fn expired_events(
        &self,
        project: &str,
        workflow: &str,
        keep: usize,
    ) -> Result<Vec<HookWorkflowRunOutgoingEvent>, StoreError> {
        let events = self.list_workflow_events(project, workflow).await?;
        Ok(events
            .into_iter()
            .skip(keep)
            .filter(|e| e.is_terminal())
            .collect())
    }

    pub async fn mark_in_progress(
        &self,
        event: &HookWorkflowRunOutgoingEvent,
    ) -> Result<(), StoreError> {
        self.store
            .set_add_json(keys::OUTGOING_EVENT_IN_PROGRESS, &event.key(), event)
            .await
    }

    pub async fn remove_in_progress(&self, key: &str) -> Result<(), StoreError> {
        self.store
            .set_remove(keys::OUTGOING_EVENT_IN_PROGRESS, key)
            .await
    }

    pub async fn in_progress_keys(&self) -> Result<Vec<String>, StoreError> {
        self.store.set_members(keys::OUTGOING_EVENT_IN_PROGRESS).await
    }

    pub async fn in_progress_count(&self) -> Result<usize, StoreError> {
        self.store.set_card(keys::OUTGOING_EVENT_IN_PROGRESS).await
    }

    pub async fn enqueue(&self, key: &str) -> Result<(), StoreError> {
        self.store.enqueue(keys::OUTGOING_EVENT_QUEUE, key).await?;
        self.counters.enqueued();
        Ok(())
    }

    pub async fn dequeue(&self, wait: Duration) -> Result<Option<String>, StoreError> {
        let key = self.store.dequeue(keys::OUTGOING_EVENT_QUEUE, wait).await?;
        if key.is_some() {
            self.counters.dequeued();
        }
        Ok(key)
    }

    pub async fn queue_len(&self) -> Result<usize, StoreError> {
        self.store.queue_len(keys::OUTGOING_EVENT_QUEUE).await
    }

    /// Save a run completion notice, track it and queue it for the cascade.
    pub async fn create_and_enqueue(
        &self,
        event: &HookWorkflowRunOutgoingEvent,
    ) -> Result<(), StoreError> {
        // Tracked first: a record that exists is always reachable by recovery
        self.mark_in_progress(event).await?;
        self.save(event).await?;
        self.enqueue(&event.key()).await?;
        tracing::info!(
            event = %event.key(),
            workflow = %event.run.workflow_name,
            run = %event.run.workflow_run_id,
            "outgoing event created"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "outgoing_tests.rs"]
mod tests;
