// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use yare::parameterized;

#[test]
#[serial]
fn state_dir_prefers_hk_state_dir() {
    std::env::set_var("HK_STATE_DIR", "/tmp/hk-state");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");

    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/hk-state"));

    std::env::remove_var("HK_STATE_DIR");
    std::env::remove_var("XDG_STATE_HOME");
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    std::env::remove_var("HK_STATE_DIR");
    std::env::set_var("XDG_STATE_HOME", "/tmp/xdg");

    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/hk"));

    std::env::remove_var("XDG_STATE_HOME");
}

#[test]
#[serial]
fn missing_api_url_is_an_error() {
    std::env::set_var("HK_API_URL", "   ");

    assert!(matches!(
        api_url(),
        Err(LifecycleError::MissingSetting("HK_API_URL"))
    ));

    std::env::remove_var("HK_API_URL");
}

#[parameterized(
    seconds = { "30s", 30_000 },
    minutes = { "5m", 300_000 },
    millis = { "250ms", 250 },
    bare = { "90", 90_000 },
)]
#[serial]
fn durations_accept_suffixes(value: &str, millis: u64) {
    std::env::set_var("HK_RETRY_DELAY", value);

    assert_eq!(
        retry_delay().unwrap(),
        Some(Duration::from_millis(millis))
    );

    std::env::remove_var("HK_RETRY_DELAY");
}

#[test]
#[serial]
fn bad_duration_names_the_variable() {
    std::env::set_var("HK_SCHEDULER_TICK", "soon");

    let err = scheduler_tick().unwrap_err();
    assert!(err.to_string().contains("HK_SCHEDULER_TICK"));

    std::env::remove_var("HK_SCHEDULER_TICK");
}

#[test]
#[serial]
fn dequeue_timeout_is_milliseconds() {
    std::env::set_var("HK_DEQUEUE_TIMEOUT_MS", "500");

    assert_eq!(dequeue_timeout().unwrap(), Some(Duration::from_millis(500)));

    std::env::remove_var("HK_DEQUEUE_TIMEOUT_MS");
}

#[test]
#[serial]
fn numbers_reject_garbage() {
    std::env::set_var("HK_WORKERS", "many");

    assert!(matches!(
        workers(),
        Err(LifecycleError::InvalidSetting { name: "HK_WORKERS", .. })
    ));

    std::env::remove_var("HK_WORKERS");
}

#[test]
#[serial]
fn unset_values_are_none() {
    std::env::remove_var("HK_RETRY_ERROR");
    std::env::remove_var("HK_LOCK_TTL");
    std::env::remove_var("HK_API_TOKEN");

    assert_eq!(retry_error().unwrap(), None);
    assert_eq!(lock_ttl().unwrap(), None);
    assert_eq!(api_token(), None);
}
