// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolution of the workflows an event should run

use super::super::Runtime;
use super::Step;
use crate::error::TransitionError;
use crate::matching;
use hk_adapters::{
    AnalysisAdapter, HookError, HookResolver, SigningKeyAdapter, WorkflowRunAdapter,
};
use hk_core::{
    Clock, EventName, EventStatus, HookId, HookRepositoryEvent, WorkflowHook, WorkflowHookMatch,
};
use hk_storage::Store;

/// Outcome of hook resolution
enum Resolution {
    Matches(Vec<WorkflowHookMatch>),
    /// The triggering hook is gone or disabled
    Skip(String),
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
    pub(crate) async fn on_workflow_hooks(
        &self,
        event: &mut HookRepositoryEvent,
    ) -> Result<Step, TransitionError> {
        // Resolved by an earlier attempt; keep those entries and their status
        if event.workflow_hooks.is_empty() {
            match self.resolve_workflow_hooks(event).await? {
                Resolution::Skip(reason) => {
                    event.skip(reason);
                    return Ok(Step::Continue);
                }
                Resolution::Matches(matches) if matches.is_empty() => {
                    tracing::info!(event = %event.key(), "no workflow hook matched");
                    event.status = EventStatus::Done;
                    return Ok(Step::Continue);
                }
                Resolution::Matches(matches) => {
                    tracing::info!(
                        event = %event.key(),
                        hooks = matches.len(),
                        "workflow hooks resolved"
                    );
                    event.workflow_hooks = matches;
                }
            }
        }

        event.status = if event.event_name == EventName::Webhook {
            EventStatus::Workflow
        } else {
            EventStatus::SignKey
        };
        Ok(Step::Continue)
    }

    async fn resolve_workflow_hooks(
        &self,
        event: &HookRepositoryEvent,
    ) -> Result<Resolution, TransitionError> {
        let data = &event.extracted_data;
        let resolution = match event.event_name {
            EventName::Push | EventName::PullRequest => {
                let candidates = self
                    .hooks
                    .repository_hooks(&event.vcs_server_name, &event.repository_name)
                    .await?;
                Resolution::Matches(matching::repository_hooks(event, &candidates))
            }
            EventName::Manual => Resolution::Matches(matching::manual_hooks(event)),
            EventName::Webhook => match &data.webhook {
                Some(trigger) => match self.resolve_hook(&trigger.hook_id).await? {
                    Some(hook) => Resolution::Matches(matching::webhook_hooks(event, &hook)),
                    None => missing_hook(&trigger.hook_id),
                },
                None => Resolution::Skip("webhook event without a hook".to_string()),
            },
            EventName::Scheduler => match &data.scheduler {
                Some(trigger) => match self.resolve_hook(&trigger.hook_id).await? {
                    Some(hook) => Resolution::Matches(matching::scheduler_hooks(event, &hook)),
                    None => missing_hook(&trigger.hook_id),
                },
                None => Resolution::Skip("scheduler event without a hook".to_string()),
            },
            EventName::WorkflowRun => match &data.workflow_run {
                // Re-read the hook: it may have been disabled since the cascade
                Some(trigger) => match self.resolve_hook(&trigger.hook.id).await? {
                    Some(hook) => Resolution::Matches(matching::workflow_run_hooks(event, &hook)),
                    None => missing_hook(&trigger.hook.id),
                },
                None => Resolution::Skip("workflow-run event without a hook".to_string()),
            },
        };
        Ok(resolution)
    }

    /// The hook definition, or `None` when it was deleted or disabled.
    async fn resolve_hook(&self, id: &HookId) -> Result<Option<WorkflowHook>, TransitionError> {
        match self.hooks.hook(id).await {
            Ok(hook) if !hook.disabled => Ok(Some(hook)),
            Ok(_) | Err(HookError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn missing_hook(id: &HookId) -> Resolution {
    Resolution::Skip(format!("hook {} is missing or disabled", id))
}
