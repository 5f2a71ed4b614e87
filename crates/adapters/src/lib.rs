// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the hook service's external collaborators

pub mod analysis;
pub mod api;
pub mod hooks;
pub mod signing;
pub mod workflow;

pub use analysis::{AnalysisAdapter, AnalysisError, AnalysisInfo, AnalysisRequest};
pub use api::{ApiClient, ApiError};
pub use hooks::{HookError, HookResolver, RepositoryStatus};
pub use signing::{
    KeyOwner, OperationStatus, SigningKeyAdapter, SigningKeyError, SigningKeyOperation,
    SigningKeyRequest,
};
pub use workflow::{RunRequest, TriggeredRun, WorkflowRunAdapter, WorkflowRunError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use analysis::{AnalysisCall, FakeAnalysisAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use hooks::{FakeHookResolver, HookCall};
#[cfg(any(test, feature = "test-support"))]
pub use signing::{FakeSigningKeyAdapter, SigningCall};
#[cfg(any(test, feature = "test-support"))]
pub use workflow::FakeWorkflowRunAdapter;
