// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit signer resolution for repository activity

use super::super::Runtime;
use super::Step;
use crate::error::TransitionError;
use hk_adapters::{
    AnalysisAdapter, HookResolver, OperationStatus, SigningKeyAdapter, SigningKeyOperation,
    SigningKeyRequest, WorkflowRunAdapter,
};
use hk_core::{Clock, EventName, EventStatus, HookRepositoryEvent};
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
    pub(crate) async fn on_sign_key(
        &self,
        event: &mut HookRepositoryEvent,
    ) -> Result<Step, TransitionError> {
        let signed_activity = matches!(event.event_name, EventName::Push | EventName::PullRequest);
        if !event.user_id.is_empty() || !event.sign_key.is_empty() || !signed_activity {
            event.status = EventStatus::Workflow;
            return Ok(Step::Continue);
        }

        if event.signing_key_operation.is_empty() {
            let request = SigningKeyRequest {
                vcs_server_name: event.vcs_server_name.clone(),
                repository_name: event.repository_name.clone(),
                git_ref: event.extracted_data.git_ref.clone(),
                commit: event.extracted_data.commit.clone(),
            };
            let started = self.signing.start_operation(&request).await?;
            tracing::info!(
                event = %event.key(),
                operation = %started.uuid,
                "signing key operation started"
            );
            event.signing_key_operation = started.uuid.clone();
            if started.status != OperationStatus::Pending {
                return apply_operation(event, started);
            }
        }

        let operation = self
            .signing
            .get_operation(&event.signing_key_operation)
            .await?;
        apply_operation(event, operation)
    }
}

fn apply_operation(
    event: &mut HookRepositoryEvent,
    operation: SigningKeyOperation,
) -> Result<Step, TransitionError> {
    match operation.status {
        OperationStatus::Pending => Ok(Step::Suspend),
        OperationStatus::Error => {
            // A failed operation is not polled again; the retry starts a new one
            event.signing_key_operation.clear();
            Err(TransitionError::SigningOperation(operation.error))
        }
        OperationStatus::Done if !operation.verified || operation.signer_key_id.is_empty() => {
            event.skip(format!(
                "commit {} is not signed by a verified key",
                event.extracted_data.commit
            ));
            Ok(Step::Continue)
        }
        OperationStatus::Done => {
            event.sign_key = operation.signer_key_id;
            event.status = EventStatus::Workflow;
            Ok(Step::Continue)
        }
    }
}
