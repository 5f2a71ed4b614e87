// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler definitions and executions.
//!
//! Definitions are grouped per (VCS, repository, workflow) so a workflow's
//! schedules can be replaced as a whole. Executions share one global set so
//! the scheduler tick can scan them in a single pass.

use crate::store::{Store, StoreError, StoreExt};
use hk_core::{keys, HookId, SchedulerDefinition, SchedulerExecution};

#[derive(Clone)]
pub struct SchedulerRepository<S> {
    store: S,
}

impl<S: Store> SchedulerRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Definitions attached to one workflow
    pub async fn definitions(
        &self,
        vcs: &str,
        repo: &str,
        workflow: &str,
    ) -> Result<Vec<SchedulerDefinition>, StoreError> {
        self.store
            .set_scan_json(&keys::scheduler_definitions(vcs, repo, workflow))
            .await
    }

    /// Every stored definition, across workflows
    pub async fn all_definitions(&self) -> Result<Vec<SchedulerDefinition>, StoreError> {
        let mut out = Vec::new();
        for key in self.store.keys("hooks:scheduler:definition:*").await? {
            if let Some(def) = self.store.get_json(&key).await? {
                out.push(def);
            }
        }
        Ok(out)
    }

    pub async fn definition(&self, id: &HookId) -> Result<Option<SchedulerDefinition>, StoreError> {
        self.store
            .get_json(&keys::scheduler_definition(id.as_str()))
            .await
    }

    pub async fn save_definition(
        &self,
        vcs: &str,
        repo: &str,
        workflow: &str,
        definition: &SchedulerDefinition,
    ) -> Result<(), StoreError> {
        self.store
            .set_add_json(
                &keys::scheduler_definitions(vcs, repo, workflow),
                &keys::scheduler_definition(definition.id.as_str()),
                definition,
            )
            .await
    }

    /// Delete a definition together with its execution.
    pub async fn delete_definition(
        &self,
        vcs: &str,
        repo: &str,
        workflow: &str,
        id: &HookId,
    ) -> Result<(), StoreError> {
        let key = keys::scheduler_definition(id.as_str());
        self.store
            .set_remove(&keys::scheduler_definitions(vcs, repo, workflow), &key)
            .await?;
        self.store.delete(&key).await?;
        self.delete_execution(id).await
    }

    pub async fn executions(&self) -> Result<Vec<SchedulerExecution>, StoreError> {
        self.store.set_scan_json(keys::SCHEDULER_EXECUTIONS).await
    }

    pub async fn execution(&self, id: &HookId) -> Result<Option<SchedulerExecution>, StoreError> {
        self.store
            .get_json(&keys::scheduler_execution(id.as_str()))
            .await
    }

    pub async fn save_execution(&self, execution: &SchedulerExecution) -> Result<(), StoreError> {
        self.store
            .set_add_json(
                keys::SCHEDULER_EXECUTIONS,
                &keys::scheduler_execution(execution.scheduler_id.as_str()),
                execution,
            )
            .await
    }

    pub async fn delete_execution(&self, id: &HookId) -> Result<(), StoreError> {
        let key = keys::scheduler_execution(id.as_str());
        self.store
            .set_remove(keys::SCHEDULER_EXECUTIONS, &key)
            .await?;
        self.store.delete(&key).await
    }
}

#[cfg(test)]
#[path = "schedules_tests.rs"]
mod tests;
