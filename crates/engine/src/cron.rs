// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron expressions for scheduler hooks.
//!
//! Accepts the classic 5-field form (minute hour day-of-month month
//! day-of-week), a 6-field form with leading seconds, and the `@hourly`
//! family of macros. Weekdays `0` and `7` are both Sunday. When both
//! day-of-month and day-of-week are restricted a day matches if either
//! does, as in Vixie cron.
//!
//! Field matching is delegated to the `cron` crate, which numbers weekdays
//! from 1 (Sunday). Weekday fields are therefore rewritten to names before
//! being handed over.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("expected 5 or 6 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid day-of-week field '{0}'")]
    Weekday(String),
    #[error("invalid cron expression '{expr}': {message}")]
    Expression { expr: String, message: String },
    #[error("unknown timezone '{0}'")]
    Timezone(String),
    #[error("no upcoming execution for '{0}'")]
    NoUpcoming(String),
}

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A parsed cron expression bound to a timezone
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    tz: Tz,
    /// One schedule, or two when day-of-month and day-of-week are OR-ed
    schedules: Vec<cron::Schedule>,
}

impl CronSchedule {
    /// Parse `expr` evaluated in the IANA `timezone` (empty means UTC).
    pub fn parse(expr: &str, timezone: &str) -> Result<Self, CronError> {
        let tz = parse_timezone(timezone)?;
        let expanded = expand_macro(expr.trim())?;
        let fields: Vec<&str> = expanded.split_whitespace().collect();
        let (sec, rest) = match fields.len() {
            5 => ("0", &fields[..]),
            6 => (fields[0], &fields[1..]),
            n => return Err(CronError::FieldCount(n)),
        };
        let (min, hour, dom, month, dow) = (rest[0], rest[1], rest[2], rest[3], rest[4]);

        let dom_restricted = !is_wildcard(dom);
        let dow_restricted = !is_wildcard(dow);
        let weekdays = if dow_restricted {
            weekday_names(dow)?
        } else {
            "*".to_string()
        };

        let build = |dom: &str, dow: &str| {
            let six = format!("{} {} {} {} {} {}", sec, min, hour, dom, month, dow);
            cron::Schedule::from_str(&six).map_err(|e| CronError::Expression {
                expr: expr.to_string(),
                message: e.to_string(),
            })
        };

        let schedules = if dom_restricted && dow_restricted {
            vec![build(dom, "*")?, build("*", &weekdays)?]
        } else {
            vec![build(if dom_restricted { dom } else { "*" }, &weekdays)?]
        };

        Ok(Self {
            expr: expr.to_string(),
            tz,
            schedules,
        })
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, CronError> {
        let local = after.with_timezone(&self.tz);
        self.schedules
            .iter()
            .filter_map(|s| s.after(&local).next())
            .min()
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| CronError::NoUpcoming(self.expr.clone()))
    }
}

/// Next fire time of `expr` in `timezone`, strictly after `after`.
pub fn next_execution(
    expr: &str,
    timezone: &str,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, CronError> {
    CronSchedule::parse(expr, timezone)?.next_after(after)
}

fn parse_timezone(timezone: &str) -> Result<Tz, CronError> {
    let timezone = timezone.trim();
    if timezone.is_empty() {
        return Ok(Tz::UTC);
    }
    timezone
        .parse::<Tz>()
        .map_err(|_| CronError::Timezone(timezone.to_string()))
}

fn expand_macro(expr: &str) -> Result<String, CronError> {
    let Some(name) = expr.strip_prefix('@') else {
        return Ok(expr.to_string());
    };
    let expanded = match name.to_ascii_lowercase().as_str() {
        "yearly" | "annually" => "0 0 1 1 *",
        "monthly" => "0 0 1 * *",
        "weekly" => "0 0 * * 0",
        "daily" | "midnight" => "0 0 * * *",
        "hourly" => "0 * * * *",
        _ => {
            return Err(CronError::Expression {
                expr: expr.to_string(),
                message: "unknown macro".to_string(),
            })
        }
    };
    Ok(expanded.to_string())
}

fn is_wildcard(field: &str) -> bool {
    field == "*" || field == "?"
}

fn weekday_value(token: &str) -> Option<u8> {
    if let Ok(n) = token.parse::<u8>() {
        return (n <= 7).then_some(n);
    }
    WEEKDAYS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(token))
        .map(|i| i as u8)
}

/// Rewrite a day-of-week field (0-7, names, ranges, steps, lists) as a list
/// of weekday names.
fn weekday_names(field: &str) -> Result<String, CronError> {
    let invalid = || CronError::Weekday(field.to_string());
    let mut days = BTreeSet::new();
    for part in field.split(',') {
        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: usize = step.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(invalid());
                }
                (range, Some(step))
            }
            None => (part, None),
        };
        let (start, end) = if is_wildcard(range) {
            (0, 6)
        } else if let Some((a, b)) = range.split_once('-') {
            (
                weekday_value(a).ok_or_else(invalid)?,
                weekday_value(b).ok_or_else(invalid)?,
            )
        } else {
            let day = weekday_value(range).ok_or_else(invalid)?;
            // `N/step` runs to the end of the week
            if step.is_some() {
                (day, 6)
            } else {
                (day, day)
            }
        };
        if start > end {
            return Err(invalid());
        }
        for day in (start..=end).step_by(step.unwrap_or(1)) {
            days.insert(day % 7);
        }
    }
    Ok(days
        .iter()
        .map(|d| WEEKDAYS[*d as usize])
        .collect::<Vec<_>>()
        .join(","))
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
