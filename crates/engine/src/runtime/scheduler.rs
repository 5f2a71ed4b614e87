// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedulers.
//!
//! Definitions are stored per workflow and replaced wholesale whenever the
//! workflow is (re)analysed. Each definition has one execution holding its
//! next fire time; every instance scans executions on a tick and fires the
//! due ones under a per-definition lock.

use super::Runtime;
use crate::cron::next_execution;
use crate::error::RuntimeError;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{
    derived_uuid, keys, ms_to_utc, utc_to_ms, Clock, EventName, ExtractData, HookId,
    HookRepositoryEvent, HookType, SchedulerDefinition, SchedulerExecution, SchedulerTrigger,
    WorkflowHook,
};
use hk_storage::Store;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A stored definition and its pending execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerEntry {
    pub definition: SchedulerDefinition,
    /// `None` once the schedule has no upcoming fire time
    pub execution: Option<SchedulerExecution>,
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
    /// Replace every scheduler of a workflow with the scheduler hooks given.
    ///
    /// All schedules are validated before anything is deleted, so an invalid
    /// cron expression leaves the previous schedulers in place. A hook must
    /// listen on `vcs`/`repo` and belong to `workflow`, otherwise a later
    /// resync of its real workflow could not remove it. Disabled hooks and
    /// hooks of other types are ignored.
    pub async fn instantiate_scheduler(
        &self,
        vcs: &str,
        repo: &str,
        workflow: &str,
        hooks: &[WorkflowHook],
    ) -> Result<usize, RuntimeError> {
        let now = self.clock.utc_now();
        let mut planned = Vec::with_capacity(hooks.len());
        for hook in hooks
            .iter()
            .filter(|h| h.hook_type == HookType::Scheduler && !h.disabled)
        {
            if !belongs_to(hook, vcs, repo, workflow) {
                return Err(RuntimeError::ForeignScheduler {
                    hook: hook.id.to_string(),
                    expected: format!("{}/{}/{}", vcs, repo, workflow),
                    actual: format!(
                        "{}/{}/{}",
                        hook.vcs_server_name, hook.repository_name, hook.workflow_name
                    ),
                });
            }
            let next = next_execution(&hook.data.cron, &hook.data.timezone, now).map_err(
                |source| RuntimeError::InvalidSchedule {
                    hook: hook.id.to_string(),
                    source,
                },
            )?;
            planned.push((hook, next));
        }

        self.delete_scheduler(vcs, repo, workflow).await?;
        for (hook, next) in &planned {
            self.schedules
                .save_definition(vcs, repo, workflow, hook)
                .await?;
            self.schedules
                .save_execution(&SchedulerExecution::new(hook.id.clone(), utc_to_ms(*next)))
                .await?;
            tracing::debug!(scheduler = %hook.id, next = %next, "scheduler stored");
        }
        tracing::info!(
            vcs,
            repo,
            workflow,
            schedulers = planned.len(),
            "schedulers instantiated"
        );
        Ok(planned.len())
    }

    /// Delete every scheduler of a workflow. Returns how many were removed.
    pub async fn delete_scheduler(
        &self,
        vcs: &str,
        repo: &str,
        workflow: &str,
    ) -> Result<usize, RuntimeError> {
        let existing = self.schedules.definitions(vcs, repo, workflow).await?;
        for definition in &existing {
            self.schedules
                .delete_definition(vcs, repo, workflow, &definition.id)
                .await?;
        }
        if !existing.is_empty() {
            tracing::info!(vcs, repo, workflow, removed = existing.len(), "schedulers deleted");
        }
        Ok(existing.len())
    }

    pub async fn list_schedulers(
        &self,
        vcs: &str,
        repo: &str,
        workflow: &str,
    ) -> Result<Vec<SchedulerEntry>, RuntimeError> {
        let mut entries = Vec::new();
        for definition in self.schedules.definitions(vcs, repo, workflow).await? {
            let execution = self.schedules.execution(&definition.id).await?;
            entries.push(SchedulerEntry {
                definition,
                execution,
            });
        }
        Ok(entries)
    }

    /// Fire every due execution. Returns how many this instance fired.
    pub async fn fire_due_schedulers(&self) -> Result<usize, RuntimeError> {
        let now = self.clock.epoch_ms();
        let mut fired = 0;
        for execution in self.schedules.executions().await? {
            if execution.is_due(now) && self.fire_scheduler(&execution.scheduler_id).await? {
                fired += 1;
            }
        }
        Ok(fired)
    }

    /// Fire one scheduler if it is still due.
    ///
    /// A single lock attempt: when another instance holds it, that instance
    /// is firing the same execution.
    pub async fn fire_scheduler(&self, id: &HookId) -> Result<bool, RuntimeError> {
        let lock = keys::scheduler_lock(id.as_str());
        if !self.try_lock(&lock).await? {
            tracing::debug!(scheduler = %id, "scheduler locked elsewhere");
            return Ok(false);
        }
        let result = self.fire_locked(id).await;
        self.unlock(&lock).await;
        result
    }

    async fn fire_locked(&self, id: &HookId) -> Result<bool, RuntimeError> {
        let now = self.clock.epoch_ms();
        let Some(mut execution) = self.schedules.execution(id).await? else {
            return Ok(false);
        };
        // Fired by another instance since the scan
        if !execution.is_due(now) {
            return Ok(false);
        }
        let Some(definition) = self.schedules.definition(id).await? else {
            tracing::warn!(scheduler = %id, "definition gone, dropping execution");
            self.schedules.delete_execution(id).await?;
            return Ok(false);
        };

        let event = scheduler_event(&definition, execution.next_execution_time, now);
        self.events.create_or_requeue(&event).await?;
        tracing::info!(
            scheduler = %id,
            workflow = %definition.workflow_name,
            event = %event.key(),
            "scheduler fired"
        );

        // Missed fire times collapse into this one firing
        let after = ms_to_utc(now.max(execution.next_execution_time));
        match next_execution(&definition.data.cron, &definition.data.timezone, after) {
            Ok(next) => {
                execution.last_execution_time = Some(execution.next_execution_time);
                execution.next_execution_time = utc_to_ms(next);
                self.schedules.save_execution(&execution).await?;
            }
            Err(e) => {
                tracing::warn!(
                    scheduler = %id,
                    error = %e,
                    "no upcoming fire time, execution dropped"
                );
                self.schedules.delete_execution(id).await?;
            }
        }
        Ok(true)
    }

    /// Fire due schedulers every `scheduler_tick` until `cancel` fires.
    pub async fn run_scheduler_loop(&self, cancel: CancellationToken) -> Result<(), RuntimeError> {
        let mut tick = tokio::time::interval(self.config.scheduler_tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("scheduler started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    let fired = self.fire_due_schedulers().await?;
                    if fired > 0 {
                        tracing::debug!(fired, "scheduler tick");
                    }
                }
            }
        }
        tracing::info!("scheduler stopped");
        Ok(())
    }
}

/// Store keys are lower-cased, so the repository compares case-insensitively.
fn belongs_to(hook: &WorkflowHook, vcs: &str, repo: &str, workflow: &str) -> bool {
    hook.vcs_server_name.eq_ignore_ascii_case(vcs)
        && hook.repository_name.eq_ignore_ascii_case(repo)
        && hook.workflow_name.eq_ignore_ascii_case(workflow)
}

/// Repository event for one firing of `definition`.
///
/// The UUID is derived from the definition and the fire time so two
/// instances firing the same execution produce the same event.
pub(crate) fn scheduler_event(
    definition: &SchedulerDefinition,
    fire_time_ms: u64,
    now_ms: u64,
) -> HookRepositoryEvent {
    let uuid = derived_uuid(&[definition.id.as_str(), &fire_time_ms.to_string()]);
    let (target_vcs, target_repository) = definition.workflow_location();
    let branch = &definition.data.target_branch;
    let mut event = HookRepositoryEvent::new(
        uuid,
        &definition.vcs_server_name,
        &definition.repository_name,
        EventName::Scheduler,
        now_ms,
    )
    .with_extracted_data(ExtractData {
        git_ref: if branch.is_empty() {
            String::new()
        } else {
            format!("refs/heads/{}", branch)
        },
        commit: definition.data.target_commit.clone(),
        scheduler: Some(SchedulerTrigger {
            hook_id: definition.id.clone(),
            project_key: definition.project_key.clone(),
            workflow_name: definition.workflow_name.clone(),
            target_vcs: target_vcs.to_string(),
            target_repository: target_repository.to_string(),
            target_branch: branch.clone(),
            target_commit: definition.data.target_commit.clone(),
            cron: definition.data.cron.clone(),
            timezone: definition.data.timezone.clone(),
        }),
        ..Default::default()
    });
    event.event_type = EventName::Scheduler.as_str().to_string();
    event
}
