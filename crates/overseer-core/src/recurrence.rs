//! Next-occurrence calculation for recurring tasks.
//!
//! Pure wall-clock math -- no storage access. Given a recurrence rule and
//! the current instant, computes the next absolute occurrence; given a
//! deadline anchor and a timezone, recomputes the next deadline. Neither
//! ever returns a past instant.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{CoreError, Result};
use crate::model::RecurrenceRule;

/// Compute the next occurrence after `now`.
///
/// - With `interval_hours`: `now + interval`.
/// - With a weekday set: scan days 1..=7 ahead and take the first day in
///   the set, at `time_of_day` if given, else at the current wall-clock
///   time.
/// - Otherwise: `now + 24h`.
pub fn next_occurrence<T: TimeZone>(rule: &RecurrenceRule, now: DateTime<T>) -> DateTime<T> {
    if let Some(hours) = rule.interval_hours {
        return now + Duration::hours(hours.max(1));
    }

    if let Some(days) = rule.weekdays.as_deref() {
        let time = rule.time_of_day.unwrap_or_else(|| now.time());
        for ahead in 1..=7 {
            let date = now.date_naive() + Duration::days(ahead);
            if !days.contains(&date.weekday()) {
                continue;
            }
            // earliest() skips non-existent local times around DST gaps.
            if let Some(next) = now
                .timezone()
                .from_local_datetime(&date.and_time(time))
                .earliest()
            {
                return next;
            }
        }
    }

    now + Duration::hours(24)
}

/// Next deadline for a task with an anchor time-of-day: today at `anchor`
/// in `tz`, rolling to tomorrow if that instant has already passed.
pub fn anchor_deadline(anchor: NaiveTime, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&tz);
    for ahead in 0..3 {
        let date = local_now.date_naive() + Duration::days(ahead);
        if let Some(local) = tz.from_local_datetime(&date.and_time(anchor)).earliest() {
            let candidate = local.with_timezone(&Utc);
            if candidate > now {
                return candidate;
            }
        }
    }
    now + Duration::hours(24)
}

/// Parse an IANA timezone identifier.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| CoreError::InvalidTimezone(name.to_string()))
}

/// Parse a comma-separated weekday set, e.g. `"mon,wed,fri"`.
pub fn parse_weekday_set(input: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for code in input.split(',') {
        let day = parse_weekday(code.trim()).ok_or_else(|| {
            CoreError::InvalidRecurrenceRule(format!("unknown weekday: {}", code.trim()))
        })?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    if days.is_empty() {
        return Err(CoreError::InvalidRecurrenceRule(
            "empty weekday set".to_string(),
        ));
    }
    Ok(days)
}

/// Parse a `HH:MM` wall-clock time.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M")
        .map_err(|_| CoreError::InvalidRecurrenceRule(format!("invalid time of day: {input}")))
}

pub(crate) fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

pub(crate) fn parse_weekday(code: &str) -> Option<Weekday> {
    match code.to_ascii_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
