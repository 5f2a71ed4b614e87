// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake analysis adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{AnalysisAdapter, AnalysisError, AnalysisInfo, AnalysisRequest};
use async_trait::async_trait;
use hk_core::AnalysisStatus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded analysis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisCall {
    ListProjects { vcs: String, repo: String },
    Start { project: String, commit: String },
    Get { project: String, analysis_id: String },
}

#[derive(Default)]
struct FakeAnalysisState {
    projects: Vec<String>,
    /// Status reported by `start_analysis`, per project
    on_start: HashMap<String, AnalysisStatus>,
    /// Status reported by `get_analysis`, per analysis id
    statuses: HashMap<String, AnalysisStatus>,
    unavailable: bool,
    calls: Vec<AnalysisCall>,
}

/// Scripted analysis service
#[derive(Clone, Default)]
pub struct FakeAnalysisAdapter {
    inner: Arc<Mutex<FakeAnalysisState>>,
}

impl FakeAnalysisAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects returned by `list_projects` for any repository
    pub fn set_projects(&self, projects: &[&str]) {
        self.inner.lock().projects = projects.iter().map(|p| p.to_string()).collect();
    }

    /// Status returned when an analysis for `project` starts. Defaults to
    /// `Succeed`.
    pub fn start_with(&self, project: &str, status: AnalysisStatus) {
        self.inner
            .lock()
            .on_start
            .insert(project.to_string(), status);
    }

    /// Move an analysis to `status`
    pub fn complete(&self, analysis_id: &str, status: AnalysisStatus) {
        self.inner
            .lock()
            .statuses
            .insert(analysis_id.to_string(), status);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    pub fn calls(&self) -> Vec<AnalysisCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of analyses started for `project`
    pub fn started(&self, project: &str) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, AnalysisCall::Start { project: p, .. } if p == project))
            .count()
    }

    fn record(&self, call: AnalysisCall) -> Result<(), AnalysisError> {
        let mut state = self.inner.lock();
        state.calls.push(call);
        if state.unavailable {
            return Err(AnalysisError::Unavailable("fake analysis offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AnalysisAdapter for FakeAnalysisAdapter {
    async fn list_projects(&self, vcs: &str, repo: &str) -> Result<Vec<String>, AnalysisError> {
        self.record(AnalysisCall::ListProjects {
            vcs: vcs.to_string(),
            repo: repo.to_string(),
        })?;
        Ok(self.inner.lock().projects.clone())
    }

    async fn start_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisInfo, AnalysisError> {
        self.record(AnalysisCall::Start {
            project: request.project_key.clone(),
            commit: request.commit.clone(),
        })?;
        let mut state = self.inner.lock();
        let status = state
            .on_start
            .get(&request.project_key)
            .copied()
            .unwrap_or(AnalysisStatus::Succeed);
        let analysis_id = format!("analysis-{}-{}", request.project_key, request.commit);
        state.statuses.insert(analysis_id.clone(), status);
        Ok(AnalysisInfo {
            analysis_id,
            status,
        })
    }

    async fn get_analysis(
        &self,
        project: &str,
        _vcs: &str,
        _repo: &str,
        analysis_id: &str,
    ) -> Result<AnalysisInfo, AnalysisError> {
        self.record(AnalysisCall::Get {
            project: project.to_string(),
            analysis_id: analysis_id.to_string(),
        })?;
        let status = self
            .inner
            .lock()
            .statuses
            .get(analysis_id)
            .copied()
            .ok_or_else(|| AnalysisError::NotFound(analysis_id.to_string()))?;
        Ok(AnalysisInfo {
            analysis_id: analysis_id.to_string(),
            status,
        })
    }
}
