// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow run cascade.
//!
//! A finished run becomes an outgoing event. Processing it creates one
//! repository event per downstream workflow-run hook. Downstream UUIDs are
//! derived from the outgoing event and the hook, so a retried cascade finds
//! the events it already created instead of creating them twice.

use super::Runtime;
use crate::error::{RuntimeError, TransitionError};
use crate::matching;
use futures::FutureExt;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{
    derived_uuid, keys, Clock, EventName, ExtractData, HookRepositoryEvent, HookStatus,
    HookToTrigger, HookWorkflowRunOutgoingEvent, OutgoingStatus, WorkflowHook,
    WorkflowRunCompletion, WorkflowRunTrigger,
};
use hk_storage::{Store, StoreError};
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
    /// Record a finished workflow run and queue its cascade.
    ///
    /// Reporting the same run twice returns the existing outgoing event.
    pub async fn notify_run_completed(
        &self,
        run: WorkflowRunCompletion,
    ) -> Result<HookWorkflowRunOutgoingEvent, RuntimeError> {
        let uuid = derived_uuid(&[&run.project_key, &run.workflow_name, &run.workflow_run_id]);
        let event = HookWorkflowRunOutgoingEvent::new(uuid, run, self.clock.epoch_ms());
        if let Some(existing) = self.outgoing.get(&event.key()).await? {
            tracing::debug!(outgoing = %event.key(), "run completion already recorded");
            return Ok(existing);
        }
        self.outgoing.create_and_enqueue(&event).await?;
        Ok(event)
    }

    /// Pop and process outgoing events until `cancel` fires.
    pub async fn run_cascade_loop(&self, cancel: CancellationToken) -> Result<(), RuntimeError> {
        tracing::info!("outgoing event dispatch started");
        while !cancel.is_cancelled() {
            if self.is_maintenance() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.config.dequeue_timeout) => continue,
                }
            }
            let Some(key) = self.outgoing.dequeue(self.config.dequeue_timeout).await? else {
                continue;
            };
            self.process_outgoing_event(&key).await?;
        }
        tracing::info!("outgoing event dispatch stopped");
        Ok(())
    }

    pub async fn process_outgoing_event(&self, key: &str) -> Result<(), RuntimeError> {
        let Some(event) = self.outgoing.get(key).await? else {
            tracing::debug!(outgoing = key, "outgoing event no longer exists, dropped");
            return Ok(());
        };
        if event.is_terminal() {
            self.outgoing.remove_in_progress(key).await?;
            return Ok(());
        }

        let lock = keys::outgoing_event_lock_for_key(key);
        if !self.lock(&lock).await? {
            tracing::debug!(outgoing = key, "outgoing event locked elsewhere, requeued");
            self.outgoing.enqueue(key).await?;
            return Ok(());
        }
        let result = self.process_outgoing_locked(key).await;
        self.unlock(&lock).await;
        result
    }

    async fn process_outgoing_locked(&self, key: &str) -> Result<(), RuntimeError> {
        let Some(mut event) = self.outgoing.get(key).await? else {
            return Ok(());
        };
        if event.is_terminal() {
            self.outgoing.remove_in_progress(key).await?;
            return Ok(());
        }
        if event.nb_errors >= self.config.retry_error {
            event.status = OutgoingStatus::Error;
            return self.finish_outgoing(&mut event).await;
        }

        let outcome = AssertUnwindSafe(self.cascade(&mut event))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(TransitionError::Panicked("cascade panicked".to_string())));

        match outcome {
            Ok(()) => self.finish_outgoing(&mut event).await,
            Err(e) => {
                event.record_error(e.to_string());
                tracing::warn!(
                    outgoing = key,
                    nb_errors = event.nb_errors,
                    error = %e,
                    "cascade failed"
                );
                if event.nb_errors >= self.config.retry_error {
                    event.status = OutgoingStatus::Error;
                    return self.finish_outgoing(&mut event).await;
                }
                event.last_update = self.clock.epoch_ms();
                self.outgoing.save(&event).await?;
                self.outgoing.enqueue(key).await?;
                Ok(())
            }
        }
    }

    async fn finish_outgoing(
        &self,
        event: &mut HookWorkflowRunOutgoingEvent,
    ) -> Result<(), RuntimeError> {
        event.last_update = self.clock.epoch_ms();
        self.outgoing.save(event).await?;
        self.outgoing.remove_in_progress(&event.key()).await?;
        tracing::info!(
            outgoing = %event.key(),
            status = %event.status,
            downstream = event.hooks_to_triggers.len(),
            "cascade finished"
        );
        self.prune_outgoing_events(&event.run.project_key, &event.run.workflow_name)
            .await?;
        Ok(())
    }

    /// Notify every downstream hook still `Scheduled`.
    ///
    /// Targets are resolved once; afterwards only the entries left
    /// `Scheduled` by a failed attempt are retried.
    async fn cascade(
        &self,
        event: &mut HookWorkflowRunOutgoingEvent,
    ) -> Result<(), TransitionError> {
        if event.hooks_to_triggers.is_empty() {
            let candidates = self
                .hooks
                .workflow_run_hooks(&event.run.project_key, &event.run.workflow_name)
                .await?;
            let targets = matching::cascade_targets(&event.run, &candidates);
            if targets.is_empty() {
                event.status = OutgoingStatus::Skipped;
                return Ok(());
            }
            event.hooks_to_triggers = targets.into_iter().map(HookToTrigger::new).collect();
        }

        let now = self.clock.epoch_ms();
        let mut failures = Vec::new();
        for entry in event
            .hooks_to_triggers
            .iter_mut()
            .filter(|h| h.status == HookStatus::Scheduled)
        {
            match self
                .create_downstream(&event.uuid, &event.run, &entry.hook, now)
                .await
            {
                Ok(uuid) => {
                    entry.status = HookStatus::Done;
                    entry.event_uuid = uuid;
                    entry.error.clear();
                }
                Err(e) => {
                    entry.error = e.to_string();
                    failures.push(format!("{}: {}", entry.hook.id, e));
                }
            }
        }

        if failures.is_empty() {
            event.status = OutgoingStatus::Done;
            Ok(())
        } else {
            Err(TransitionError::Cascade(failures.join("; ")))
        }
    }

    /// Create the downstream event, or queue it again when a previous
    /// attempt saved it without queueing it.
    async fn create_downstream(
        &self,
        outgoing_uuid: &str,
        run: &WorkflowRunCompletion,
        hook: &WorkflowHook,
        now_ms: u64,
    ) -> Result<String, StoreError> {
        let event = downstream_event(outgoing_uuid, run, hook, now_ms);
        self.events.create_or_requeue(&event).await?;
        Ok(event.uuid)
    }
}

/// Repository event notifying `hook` of the finished `run`.
pub(crate) fn downstream_event(
    outgoing_uuid: &str,
    run: &WorkflowRunCompletion,
    hook: &WorkflowHook,
    now_ms: u64,
) -> HookRepositoryEvent {
    let uuid = derived_uuid(&[outgoing_uuid, hook.id.as_str()]);
    let (vcs, repo) = if hook.vcs_server_name.is_empty() || hook.repository_name.is_empty() {
        (run.vcs_server_name.as_str(), run.repository_name.as_str())
    } else {
        (hook.vcs_server_name.as_str(), hook.repository_name.as_str())
    };
    let mut event = HookRepositoryEvent::new(uuid, vcs, repo, EventName::WorkflowRun, now_ms)
        .with_extracted_data(ExtractData {
            git_ref: run.git_ref.clone(),
            commit: run.commit.clone(),
            workflow_run: Some(WorkflowRunTrigger {
                outgoing_uuid: outgoing_uuid.to_string(),
                hook: hook.clone(),
                upstream_project: run.project_key.clone(),
                upstream_workflow: run.workflow_name.clone(),
                upstream_run_id: run.workflow_run_id.clone(),
                upstream_run_number: run.run_number,
                upstream_status: run.run_status.clone(),
            }),
            ..Default::default()
        });
    event.event_type = EventName::WorkflowRun.as_str().to_string();
    event.user_id = run.user_id.clone();
    event.username = run.username.clone();
    event
}
