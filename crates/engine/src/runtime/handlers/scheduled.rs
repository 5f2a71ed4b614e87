// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry of a new or restarted event

use super::super::Runtime;
use super::Step;
use crate::error::TransitionError;
use hk_adapters::{
    AnalysisAdapter, HookResolver, RepositoryStatus, SigningKeyAdapter, WorkflowRunAdapter,
};
use hk_core::{Clock, EventStatus, HookRepositoryEvent};
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
    pub(crate) async fn on_scheduled(
        &self,
        event: &mut HookRepositoryEvent,
    ) -> Result<Step, TransitionError> {
        // nb_errors is left alone: only an explicit restart resets it
        event.last_error.clear();

        if event.user_id.is_empty() {
            if let Some(manual) = &event.extracted_data.manual {
                event.user_id = manual.user_id.clone();
                event.username = manual.username.clone();
            }
        }

        let status = self
            .hooks
            .repository_status(&event.vcs_server_name, &event.repository_name)
            .await?;
        if status == RepositoryStatus::Stopped {
            event.skip(format!(
                "repository {}/{} is stopped",
                event.vcs_server_name, event.repository_name
            ));
            return Ok(Step::Continue);
        }

        event.status = if event.event_name.needs_analysis() {
            EventStatus::Analysis
        } else {
            EventStatus::WorkflowHooks
        };
        Ok(Step::Continue)
    }
}
