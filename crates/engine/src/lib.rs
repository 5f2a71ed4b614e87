// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hk-engine: event lifecycle, dispatch, schedulers and run cascades

pub mod cron;
mod duration;
mod error;
pub mod matching;
mod runtime;

pub use cron::{next_execution, CronError, CronSchedule};
pub use duration::parse_duration;
pub use error::{RuntimeError, TransitionError};
pub use runtime::{
    RecoveryReport, Runtime, RuntimeConfig, RuntimeDeps, RuntimeStats, SchedulerEntry, Step,
};
