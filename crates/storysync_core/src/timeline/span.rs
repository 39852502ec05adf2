//! Timestamp and span arithmetic for timeline range values.
//!
//! Timestamps count seconds since `0001-01-01T00:00:00` on the proleptic
//! Gregorian calendar.

use crate::model::scene::SceneDuration;
use chrono::{Datelike, Days, Duration, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

/// Timestamp of `0100-01-01T00:00:00`; earlier positions are not converted.
pub const DATE_LIMIT: i64 = 3_124_137_600;

const SECONDS_PER_MINUTE: i64 = 60;
const MINUTES_PER_HOUR: i64 = 60;
const HOURS_PER_DAY: i64 = 24;

fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// Converts a timeline timestamp to a calendar date-time.
pub fn timestamp_to_date_time(timestamp: i64) -> Option<NaiveDateTime> {
    epoch()?.checked_add_signed(Duration::try_seconds(timestamp)?)
}

/// Converts a calendar date-time to a timeline timestamp.
pub fn date_time_to_timestamp(at: NaiveDateTime) -> i64 {
    match epoch() {
        Some(epoch) => (at - epoch).num_seconds(),
        None => 0,
    }
}

/// Reads a numeric JSON value that may be stored as integer, float, or
/// numeric string.
///
/// Non-finite values and values outside the `i64` range yield `None`.
pub fn json_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().and_then(float_to_i64)),
        Value::String(text) => text.trim().parse::<f64>().ok().and_then(float_to_i64),
        _ => None,
    }
}

fn float_to_i64(float: f64) -> Option<i64> {
    // 2^63
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    let truncated = float.trunc();
    (truncated.is_finite() && truncated >= -LIMIT && truncated < LIMIT).then_some(truncated as i64)
}

/// Builds a calendar date, rolling day-of-month overflow into the next
/// month (`Feb 31` becomes `Mar 3` or `Mar 2`).
fn rolled_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day) - 1))
}

/// Converts a timeline span starting at `start` into days/hours/minutes.
///
/// Years and months are resolved against the start date, keeping its
/// day-of-month; the remaining units are added component-wise and carried
/// minutes → hours → days.
pub fn span_to_duration(start: NaiveDateTime, span: &Map<String, Value>) -> SceneDuration {
    let unit = |key: &str| span.get(key).and_then(json_number);

    let mut days = 0i64;
    let mut hours = 0i64;
    let mut minutes = 0i64;

    let years = unit("years");
    let months = unit("months");
    if years.is_some() || months.is_some() {
        let mut end_year = i64::from(start.year()) + years.unwrap_or(0);
        let mut end_month = i64::from(start.month()) + months.unwrap_or(0);
        while end_month > 12 {
            end_month -= 12;
            end_year += 1;
        }
        let start_date = start.date();
        let end = i32::try_from(end_year)
            .ok()
            .zip(u32::try_from(end_month).ok())
            .and_then(|(year, month)| rolled_date(year, month, start_date.day()));
        if let Some(end) = end {
            days = (end - start_date).num_days();
        }
    }

    if let Some(weeks) = unit("weeks") {
        days += weeks * 7;
    }
    if let Some(value) = unit("days") {
        days += value;
    }
    if let Some(value) = unit("hours") {
        days += value / HOURS_PER_DAY;
        hours += value % HOURS_PER_DAY;
    }
    if let Some(value) = unit("minutes") {
        hours += value / MINUTES_PER_HOUR;
        minutes += value % MINUTES_PER_HOUR;
    }
    if let Some(value) = unit("seconds") {
        minutes += value / SECONDS_PER_MINUTE;
    }
    hours += minutes / MINUTES_PER_HOUR;
    minutes %= MINUTES_PER_HOUR;
    days += hours / HOURS_PER_DAY;
    hours %= HOURS_PER_DAY;

    SceneDuration::new(clamp(days), clamp(hours), clamp(minutes))
}

fn clamp(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Converts a scene duration into a timeline span object.
pub fn duration_to_span(duration: &SceneDuration) -> Map<String, Value> {
    let mut span = Map::new();
    if let Some(days) = duration.days {
        span.insert("days".to_string(), Value::from(days));
    }
    if let Some(hours) = duration.hours {
        span.insert("hours".to_string(), Value::from(hours));
    }
    if let Some(minutes) = duration.minutes {
        span.insert("minutes".to_string(), Value::from(minutes));
    }
    span
}
