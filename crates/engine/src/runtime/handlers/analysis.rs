// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository analysis of the pushed commit, one per referencing project

use super::super::Runtime;
use super::Step;
use crate::error::TransitionError;
use hk_adapters::{
    AnalysisAdapter, AnalysisRequest, HookResolver, SigningKeyAdapter, WorkflowRunAdapter,
};
use hk_core::{AnalysisAttempt, AnalysisStatus, Clock, EventStatus, HookRepositoryEvent};
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
    pub(crate) async fn on_analysis(
        &self,
        event: &mut HookRepositoryEvent,
    ) -> Result<Step, TransitionError> {
        if event.analyses.is_empty() {
            let projects = self
                .analysis
                .list_projects(&event.vcs_server_name, &event.repository_name)
                .await?;
            if projects.is_empty() {
                event.status = EventStatus::WorkflowHooks;
                return Ok(Step::Continue);
            }
            event.analyses = projects.into_iter().map(AnalysisAttempt::new).collect();
        }

        for attempt in event.analyses.iter_mut() {
            match attempt.status {
                None => {
                    let request = AnalysisRequest {
                        project_key: attempt.project_key.clone(),
                        vcs_server_name: event.vcs_server_name.clone(),
                        repository_name: event.repository_name.clone(),
                        git_ref: event.extracted_data.git_ref.clone(),
                        commit: event.extracted_data.commit.clone(),
                        hook_event_uuid: event.uuid.clone(),
                    };
                    let info = self.analysis.start_analysis(&request).await?;
                    tracing::info!(
                        project = %attempt.project_key,
                        analysis = %info.analysis_id,
                        "analysis started"
                    );
                    attempt.analysis_id = info.analysis_id;
                    attempt.status = Some(info.status);
                }
                Some(AnalysisStatus::InProgress) => {
                    let info = self
                        .analysis
                        .get_analysis(
                            &attempt.project_key,
                            &event.vcs_server_name,
                            &event.repository_name,
                            &attempt.analysis_id,
                        )
                        .await?;
                    attempt.status = Some(info.status);
                }
                Some(AnalysisStatus::Succeed | AnalysisStatus::Failed) => {}
            }
        }

        if event.analyses.iter().all(AnalysisAttempt::is_terminal) {
            event.status = EventStatus::WorkflowHooks;
            Ok(Step::Continue)
        } else {
            Ok(Step::Suspend)
        }
    }
}
