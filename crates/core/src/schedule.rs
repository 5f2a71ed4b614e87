// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler definitions and their next execution.

use crate::hook::{HookId, WorkflowHook};
use serde::{Deserialize, Serialize};

/// A scheduler hook: a [`WorkflowHook`] whose data carries `cron` and
/// `timezone`.
pub type SchedulerDefinition = WorkflowHook;

/// Next fire time of one scheduler definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerExecution {
    pub scheduler_id: HookId,
    /// Epoch milliseconds
    pub next_execution_time: u64,
    /// Epoch milliseconds of the previous firing, if any
    #[serde(default)]
    pub last_execution_time: Option<u64>,
}

impl SchedulerExecution {
    pub fn new(scheduler_id: HookId, next_execution_time: u64) -> Self {
        Self {
            scheduler_id,
            next_execution_time,
            last_execution_time: None,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.next_execution_time <= now_ms
    }
}
