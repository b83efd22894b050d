//! Cron schedule evaluation
//!
//! Scheduled task triggers run on a fixed interval and ask "did a cron firing
//! happen within the last interval?". Parsing is delegated to the `cron`
//! crate; this module adapts standard five-field expressions to it.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use cron::Schedule;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

/// Default match window, one SLI interval
pub const DEFAULT_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum CronError {
    #[error("empty cron schedule provided")]
    Empty,

    #[error("invalid cron schedule {expression:?}: {reason}")]
    Invalid { expression: String, reason: String },

    #[error("cron schedule {0:?} has no firing before the reference time")]
    NoPreviousFiring(String),

    #[error("cron schedule {0:?} never fires again")]
    NoUpcomingFiring(String),
}

/// A parsed expression
///
/// When day-of-month and day-of-week are both restricted, a day matches if
/// either field does. Each alternative is held as its own schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedules: Vec<Schedule>,
}

impl CronSchedule {
    /// Latest firing at or before `now`
    pub fn previous_firing(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter_map(|schedule| previous_firing(schedule, now))
            .max()
    }

    /// Earliest firing strictly after `now`
    pub fn next_firing(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedules
            .iter()
            .filter_map(|schedule| schedule.after(&now).find(|t| *t > now))
            .min()
    }
}

/// Parses a cron expression
///
/// Accepts standard five-field expressions (`min hour dom month dow`, Sunday
/// as 0 or 7) and `@hourly`-style macros.
pub fn parse_schedule(expression: &str) -> Result<CronSchedule, CronError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(CronError::Empty);
    }

    let schedules = normalize_expression(trimmed)?
        .iter()
        .map(|normalized| {
            Schedule::from_str(normalized).map_err(|e| CronError::Invalid {
                expression: trimmed.to_string(),
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CronSchedule { schedules })
}

/// True when `expression` parses
pub fn validate_schedule(expression: &str) -> bool {
    parse_schedule(expression).is_ok()
}

/// Checks whether `reference` falls within `window_seconds` after the most
/// recent firing of the schedule
///
/// Only firings at or before the reference count, so a trigger never fires
/// early. Defaults to the current UTC time.
pub fn check_schedule_match(
    expression: &str,
    window_seconds: u64,
    reference: Option<DateTime<Utc>>,
) -> Result<bool, CronError> {
    let schedule = parse_schedule(expression)?;
    let now = reference.unwrap_or_else(Utc::now);

    let previous = schedule
        .previous_firing(now)
        .ok_or_else(|| CronError::NoPreviousFiring(expression.to_string()))?;

    let elapsed = now.signed_duration_since(previous);
    let window_ms = i64::try_from(window_seconds)
        .unwrap_or(i64::MAX / 1000)
        .saturating_mul(1000);
    let matched = elapsed.num_milliseconds() <= window_ms;

    let diff = elapsed.num_milliseconds() as f64 / 1000.0;
    if matched {
        info!(
            "Cron schedule matched: schedule={} last_run={} now={} diff={:.1}s threshold={}s",
            expression,
            previous.to_rfc3339(),
            now.to_rfc3339(),
            diff,
            window_seconds
        );
    } else {
        debug!(
            "Cron schedule not matched: schedule={} last_run={} now={} diff={:.1}s threshold={}s",
            expression,
            previous.to_rfc3339(),
            now.to_rfc3339(),
            diff,
            window_seconds
        );
    }

    Ok(matched)
}

/// Next firing strictly after `reference`, as an ISO-8601 UTC timestamp
pub fn next_run_time(
    expression: &str,
    reference: Option<DateTime<Utc>>,
) -> Result<String, CronError> {
    let schedule = parse_schedule(expression)?;
    let now = reference.unwrap_or_else(Utc::now);

    schedule
        .next_firing(now)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .ok_or_else(|| CronError::NoUpcomingFiring(expression.to_string()))
}

/// Latest firing at or before `now`
fn previous_firing(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let probe = now.trunc_subsecs(0) + Duration::seconds(1);
    schedule.after(&probe).rev().find(|t| *t <= now)
}

/// Rewrites a five-field expression into the `cron` crate's dialect
///
/// The crate expects a leading seconds field and numbers Sunday as 1, so
/// numeric day-of-week values are replaced by day names. The crate also
/// requires both day fields to match, so an expression restricting both is
/// split into a day-of-month schedule and a day-of-week schedule.
fn normalize_expression(expression: &str) -> Result<Vec<String>, CronError> {
    if expression.starts_with('@') {
        return Ok(vec![expression.to_string()]);
    }

    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, dom, month, dow] = fields[..] else {
        return Err(CronError::Invalid {
            expression: expression.to_string(),
            reason: format!("expected 5 fields, found {}", fields.len()),
        });
    };

    let dow = day_of_week_names(dow);
    let expressions = if is_restricted(dom) && is_restricted(&dow) {
        vec![
            format!("0 {} {} {} {} *", minute, hour, dom, month),
            format!("0 {} {} * {} {}", minute, hour, month, dow),
        ]
    } else {
        vec![format!("0 {} {} {} {} {}", minute, hour, dom, month, dow)]
    };

    Ok(expressions)
}

fn is_restricted(field: &str) -> bool {
    !matches!(field, "*" | "?")
}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn day_of_week_names(field: &str) -> String {
    field
        .split(',')
        .map(day_of_week_item)
        .collect::<Vec<_>>()
        .join(",")
}

/// One comma-separated day-of-week item in day names
///
/// Ranges ending on Sunday-as-7 and stepped ranges are spelled out, since the
/// crate's numbering would shift them. Items that are not numeric are kept.
fn day_of_week_item(item: &str) -> String {
    let (range, step) = match item.split_once('/') {
        Some((range, step)) => (range, Some(step)),
        None => (item, None),
    };
    if !is_restricted(range) {
        return item.to_string();
    }

    let bounds = match range.split_once('-') {
        Some((first, last)) => first.parse::<usize>().ok().zip(last.parse::<usize>().ok()),
        None => range
            .parse::<usize>()
            .ok()
            .map(|first| (first, if step.is_some() { 6 } else { first })),
    };
    let Some((first, last)) = bounds.filter(|(first, last)| first <= last && *last <= 7) else {
        return item.to_string();
    };

    let step = match step.map(str::parse::<usize>) {
        None => 1,
        Some(Ok(n)) if n > 0 => n,
        Some(_) => return item.to_string(),
    };

    if step == 1 && last < 7 {
        return if first == last {
            DAY_NAMES[first].to_string()
        } else {
            format!("{}-{}", DAY_NAMES[first], DAY_NAMES[last])
        };
    }

    let mut names: Vec<&str> = Vec::new();
    for day in (first..=last).step_by(step) {
        let name = DAY_NAMES[day % 7];
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.join(",")
}
