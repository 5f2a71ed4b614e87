// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use hk_engine::parse_duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: HK_STATE_DIR > XDG_STATE_HOME/hk > ~/.local/state/hk
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("HK_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("hk"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/hk"))
}

/// Base URL of the platform API
pub fn api_url() -> Result<String, LifecycleError> {
    non_empty("HK_API_URL").ok_or(LifecycleError::MissingSetting("HK_API_URL"))
}

pub fn api_token() -> Option<String> {
    non_empty("HK_API_TOKEN")
}

pub fn api_timeout() -> Result<Option<Duration>, LifecycleError> {
    duration("HK_API_TIMEOUT")
}

/// Failed attempts before an event turns `Error`
pub fn retry_error() -> Result<Option<u32>, LifecycleError> {
    number("HK_RETRY_ERROR")
}

pub fn retry_delay() -> Result<Option<Duration>, LifecycleError> {
    duration("HK_RETRY_DELAY")
}

pub fn scheduler_tick() -> Result<Option<Duration>, LifecycleError> {
    duration("HK_SCHEDULER_TICK")
}

/// Queue poll wait, in milliseconds
pub fn dequeue_timeout() -> Result<Option<Duration>, LifecycleError> {
    Ok(number::<u64>("HK_DEQUEUE_TIMEOUT_MS")?.map(Duration::from_millis))
}

pub fn recovery_interval() -> Result<Option<Duration>, LifecycleError> {
    duration("HK_RECOVERY_INTERVAL")
}

/// Number of dispatch workers
pub fn workers() -> Result<Option<usize>, LifecycleError> {
    number("HK_WORKERS")
}

pub fn lock_ttl() -> Result<Option<Duration>, LifecycleError> {
    duration("HK_LOCK_TTL")
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn duration(name: &'static str) -> Result<Option<Duration>, LifecycleError> {
    non_empty(name)
        .map(|value| {
            parse_duration(&value).map_err(|reason| LifecycleError::InvalidSetting {
                name,
                value,
                reason,
            })
        })
        .transpose()
}

fn number<T>(name: &'static str) -> Result<Option<T>, LifecycleError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|e| LifecycleError::InvalidSetting {
                    name,
                    reason: e.to_string(),
                    value,
                })
        })
        .transpose()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
