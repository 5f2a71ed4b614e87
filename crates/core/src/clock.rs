// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wall-clock abstraction.
//!
//! Event timestamps (`created`, `last_update`) and scheduler fire times are
//! wall-clock epoch milliseconds shared between worker instances, so the
//! clock is injectable and tests drive it with [`FakeClock`].

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Milliseconds since the Unix epoch
    fn epoch_ms(&self) -> u64;

    /// Current time as a UTC datetime
    fn utc_now(&self) -> DateTime<Utc> {
        ms_to_utc(self.epoch_ms())
    }
}

/// Convert epoch milliseconds to a UTC datetime, saturating on overflow.
pub fn ms_to_utc(ms: u64) -> DateTime<Utc> {
    let ms = i64::try_from(ms).unwrap_or(i64::MAX);
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Convert a UTC datetime to epoch milliseconds (pre-epoch clamps to 0).
pub fn utc_to_ms(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}

/// System clock for production use
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually driven clock for tests
#[derive(Clone, Debug)]
pub struct FakeClock {
    now_ms: Arc<Mutex<u64>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    /// Starts at 2024-01-01T00:00:00Z
    pub fn new() -> Self {
        Self::at_ms(1_704_067_200_000)
    }

    pub fn at_ms(ms: u64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(ms)),
        }
    }

    pub fn at(at: DateTime<Utc>) -> Self {
        Self::at_ms(utc_to_ms(at))
    }

    pub fn advance(&self, by: Duration) {
        *self.now_ms.lock() += by.as_millis() as u64;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now_ms.lock() = utc_to_ms(at);
    }
}

impl Clock for FakeClock {
    fn epoch_ms(&self) -> u64 {
        *self.now_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
