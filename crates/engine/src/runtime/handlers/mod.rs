// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle transitions of a repository event.
//!
//! Each handler looks at what the event already records and only performs
//! the sub-work still missing, so calling [`Runtime::advance`] again on the
//! same persisted state converges instead of repeating side effects.

mod analysis;
mod scheduled;
mod sign_key;
mod workflow;
mod workflow_hooks;

use super::Runtime;
use crate::error::TransitionError;
use hk_adapters::{AnalysisAdapter, HookResolver, SigningKeyAdapter, WorkflowRunAdapter};
use hk_core::{Clock, EventStatus, HookRepositoryEvent};
use hk_storage::Store;

/// What the dispatcher should do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Status moved on; keep advancing
    Continue,
    /// Waiting on a collaborator; the event stays tracked until recovery
    /// picks it up again
    Suspend,
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
    /// Run the transition for the event's current status.
    ///
    /// Mutates `event` in place, including on error, so partial progress
    /// is persisted by the caller either way.
    pub async fn advance(&self, event: &mut HookRepositoryEvent) -> Result<Step, TransitionError> {
        let from = event.status;
        let step = match event.status {
            EventStatus::Scheduled => self.on_scheduled(event).await?,
            EventStatus::Analysis => self.on_analysis(event).await?,
            EventStatus::WorkflowHooks => self.on_workflow_hooks(event).await?,
            EventStatus::SignKey => self.on_sign_key(event).await?,
            EventStatus::Workflow => self.on_workflow(event).await?,
            EventStatus::Done | EventStatus::Skipped | EventStatus::Error => Step::Suspend,
        };
        if event.status != from {
            tracing::info!(
                event = %event.key(),
                from = %from,
                to = %event.status,
                "event transition"
            );
        }
        Ok(step)
    }
}
