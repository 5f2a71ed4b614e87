// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retention of finished records.
//!
//! Expired records are listed from a snapshot, then each one is deleted
//! under its own lock after a reload. A record restarted or still held by
//! another worker in the meantime is left alone.

use super::Runtime;
use crate::error::RuntimeError;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{keys, Clock, HookRepositoryEvent, HookWorkflowRunOutgoingEvent};
use hk_storage::Store;

impl<S, H, A, K, W, C> Runtime<S, H, A, K, W, C>
where
    S: Store,
    H: HookResolver,
    A: AnalysisAdapter,
    K: SigningKeyAdapter,
    W: WorkflowRunAdapter,
    C: Clock,
{
    /// Delete finished events of a repository beyond the configured count.
    pub async fn prune_repository_events(
        &self,
        vcs: &str,
        repo: &str,
    ) -> Result<usize, RuntimeError> {
        let expired = self
            .events
            .expired_events(vcs, repo, self.config.max_events_per_repository)
            .await?;
        let deleted = self.delete_expired_events(&expired).await?;
        if deleted > 0 {
            tracing::debug!(vcs, repo, deleted, "pruned repository events");
        }
        Ok(deleted)
    }

    pub(crate) async fn delete_expired_events(
        &self,
        expired: &[HookRepositoryEvent],
    ) -> Result<usize, RuntimeError> {
        let mut deleted = 0;
        for event in expired {
            let key = event.key();
            let lock = keys::repository_event_lock_for_key(&key);
            if !self.try_lock(&lock).await? {
                tracing::debug!(event = %key, "event locked elsewhere, kept");
                continue;
            }
            let result = match self.events.get(&key).await {
                Ok(Some(current)) if current.is_terminal() => {
                    self.events.delete(&current).await.map(|()| true)
                }
                Ok(_) => Ok(false),
                Err(e) => Err(e),
            };
            self.unlock(&lock).await;
            if result? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Delete finished outgoing events of a workflow beyond the configured count.
    pub async fn prune_outgoing_events(
        &self,
        project: &str,
        workflow: &str,
    ) -> Result<usize, RuntimeError> {
        let expired = self
            .outgoing
            .expired_events(project, workflow, self.config.max_outgoing_per_workflow)
            .await?;
        let deleted = self.delete_expired_outgoing(&expired).await?;
        if deleted > 0 {
            tracing::debug!(project, workflow, deleted, "pruned outgoing events");
        }
        Ok(deleted)
    }

    pub(crate) async fn delete_expired_outgoing(
        &self,
        expired: &[HookWorkflowRunOutgoingEvent],
    ) -> Result<usize, RuntimeError> {
        let mut deleted = 0;
        for event in expired {
            let key = event.key();
            let lock = keys::outgoing_event_lock_for_key(&key);
            if !self.try_lock(&lock).await? {
                continue;
            }
            let result = match self.outgoing.get(&key).await {
                Ok(Some(current)) if current.is_terminal() => {
                    self.outgoing.delete(&current).await.map(|()| true)
                }
                Ok(_) => Ok(false),
                Err(e) => Err(e),
            };
            self.unlock(&lock).await;
            if result? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}
