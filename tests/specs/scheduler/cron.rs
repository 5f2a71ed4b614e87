//! Cron evaluation specs

use crate::prelude::*;
use chrono::{TimeZone, Utc};
use hk_core::test_support::{scheduler_hook, TEST_REPO, TEST_VCS};
use hk_core::utc_to_ms;
use hk_engine::next_execution;
use yare::parameterized;

#[parameterized(
    hourly_utc = { "0 * * * *", "UTC", (2024, 1, 1, 1, 0) },
    hourly_default_zone = { "0 * * * *", "", (2024, 1, 1, 1, 0) },
    every_five = { "*/5 * * * *", "UTC", (2024, 1, 1, 0, 5) },
    nine_in_paris = { "0 9 * * *", "Europe/Paris", (2024, 1, 1, 8, 0) },
    weekdays = { "30 2 * * 1-5", "UTC", (2024, 1, 1, 2, 30) },
    daily_macro = { "@daily", "UTC", (2024, 1, 2, 0, 0) },
)]
fn next_fire_time_after_new_year(expr: &str, timezone: &str, expected: (i32, u32, u32, u32, u32)) {
    let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let (y, mo, d, h, mi) = expected;

    let next = next_execution(expr, timezone, after).unwrap();

    assert_eq!(next, Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap());
}

#[tokio::test]
async fn stored_schedule_fires_at_the_next_hour() {
    let world = World::new();
    let runtime = world.instance();

    runtime
        .instantiate_scheduler(
            TEST_VCS,
            TEST_REPO,
            "nightly",
            &[scheduler_hook("h-1", "nightly", "0 * * * *")],
        )
        .await
        .unwrap();

    let entries = runtime
        .list_schedulers(TEST_VCS, TEST_REPO, "nightly")
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let execution = entries[0].execution.clone().unwrap();
    assert_eq!(
        execution.next_execution_time,
        utc_to_ms(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap())
    );
}
