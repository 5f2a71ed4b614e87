// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use crate::cron::CronError;
use hk_adapters::{AnalysisError, HookError, SigningKeyError};
use hk_storage::StoreError;
use thiserror::Error;

/// Errors that stop a runtime loop or reject an operation
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid schedule for hook {hook}: {source}")]
    InvalidSchedule {
        hook: String,
        #[source]
        source: CronError,
    },
    #[error("scheduler hook {hook} belongs to {actual}, not {expected}")]
    ForeignScheduler {
        hook: String,
        expected: String,
        actual: String,
    },
    #[error("event not found: {0}")]
    EventNotFound(String),
    #[error("event {0} is locked by another worker")]
    EventLocked(String),
}

/// A failed lifecycle step. Recorded on the event and retried.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("hook resolution failed: {0}")]
    Hook(#[from] HookError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("signing key resolution failed: {0}")]
    SigningKey(#[from] SigningKeyError),
    #[error("signing key operation failed: {0}")]
    SigningOperation(String),
    #[error("workflow trigger failed: {0}")]
    Workflow(String),
    #[error("cascade failed: {0}")]
    Cascade(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("panic while processing: {0}")]
    Panicked(String),
}
