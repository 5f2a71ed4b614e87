// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggering of the resolved workflow runs

use super::super::Runtime;
use super::Step;
use crate::error::TransitionError;
use hk_adapters::{
    AnalysisAdapter, HookResolver, RunRequest, SigningKeyAdapter, WorkflowRunAdapter,
    WorkflowRunError,
};
use hk_core::{Clock, EventStatus, HookRepositoryEvent, HookStatus};
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
    /// Trigger every entry still `Scheduled`. Entries already `Done` keep
    /// their run and are never triggered twice. A rejected trigger marks its
    /// entry `Skipped`; when every entry is skipped the event is too.
    pub(crate) async fn on_workflow(
        &self,
        event: &mut HookRepositoryEvent,
    ) -> Result<Step, TransitionError> {
        if event.user_id.is_empty() && !event.sign_key.is_empty() {
            let owner = self.signing.key_owner(&event.sign_key).await?;
            event.user_id = owner.user_id;
            event.username = owner.username;
        }

        let payload = event
            .extracted_data
            .manual
            .as_ref()
            .map(|m| m.payload.clone())
            .unwrap_or_default();
        let event_key = event.key();

        let mut failures = Vec::new();
        for entry in event
            .workflow_hooks
            .iter_mut()
            .filter(|h| h.status == HookStatus::Scheduled)
        {
            let request = RunRequest {
                project_key: entry.project_key.clone(),
                workflow_name: entry.workflow_name.clone(),
                vcs_server_name: entry.vcs_server_name.clone(),
                repository_name: entry.repository_name.clone(),
                target_branch: entry.target_branch.clone(),
                target_commit: entry.target_commit.clone(),
                hook_id: entry.hook_id.clone(),
                hook_type: entry.hook_type,
                hook_event_uuid: event.uuid.clone(),
                user_id: event.user_id.clone(),
                username: event.username.clone(),
                payload: payload.clone(),
            };
            match self.workflows.trigger_run(&request).await {
                Ok(run) => {
                    tracing::info!(
                        event = %event_key,
                        workflow = %entry.workflow_name,
                        run = %run.run_id,
                        "workflow run triggered"
                    );
                    entry.status = HookStatus::Done;
                    entry.run_id = run.run_id;
                    entry.run_number = Some(run.run_number);
                    entry.error.clear();
                }
                Err(WorkflowRunError::Rejected(reason)) => {
                    tracing::warn!(
                        event = %event_key,
                        workflow = %entry.workflow_name,
                        reason = %reason,
                        "workflow run rejected, entry skipped"
                    );
                    entry.status = HookStatus::Skipped;
                    entry.error = reason;
                }
                Err(e) => {
                    tracing::warn!(
                        event = %event_key,
                        workflow = %entry.workflow_name,
                        error = %e,
                        "workflow run trigger failed"
                    );
                    entry.error = e.to_string();
                    failures.push(format!("{}: {}", entry.workflow_name, e));
                }
            }
        }

        if failures.is_empty() {
            let all_skipped = !event.workflow_hooks.is_empty()
                && event
                    .workflow_hooks
                    .iter()
                    .all(|h| h.status == HookStatus::Skipped);
            event.status = if all_skipped {
                EventStatus::Skipped
            } else {
                EventStatus::Done
            };
            Ok(Step::Continue)
        } else {
            Err(TransitionError::Workflow(failures.join("; ")))
        }
    }
}
