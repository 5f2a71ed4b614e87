// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hk-core: domain types for the hook orchestration service

pub mod clock;
pub mod event;
pub mod hook;
pub mod id;
pub mod keys;
pub mod outgoing;
pub mod schedule;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{ms_to_utc, utc_to_ms, Clock, FakeClock, SystemClock};
pub use event::{
    AnalysisAttempt, AnalysisStatus, EventName, EventStatus, ExtractData, HookRepositoryEvent,
    HookStatus, ManualTrigger, SchedulerTrigger, WebhookTrigger, WorkflowHookMatch,
    WorkflowRunTrigger,
};
pub use hook::{HookData, HookId, HookType, WorkflowHook};
pub use id::derived_uuid;
pub use outgoing::{
    HookToTrigger, HookWorkflowRunOutgoingEvent, OutgoingStatus, WorkflowRunCompletion,
};
pub use schedule::{SchedulerDefinition, SchedulerExecution};
