//! Day-boundary arithmetic. All day math runs on UTC calendar days, which
//! are a fixed 86 400 000 ms — no DST jumps — so day enumeration is a plain
//! millisecond stride.

use chrono::{DateTime, Duration, NaiveTime, Utc};

pub const DAY_MS: i64 = 86_400_000;

/// Truncate an instant to 00:00:00.000 of its calendar day.
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// 23:59:59.999 of the instant's calendar day.
pub fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(t) + Duration::milliseconds(DAY_MS - 1)
}

/// Integer key identifying a calendar day: the millisecond timestamp of its
/// start. Two moments on the same day always map to the same key.
pub fn day_key(t: DateTime<Utc>) -> i64 {
    start_of_day(t).timestamp_millis()
}

/// Inclusive, ascending day keys from `start`'s day to `end`'s day.
/// Empty when `end` is an earlier day than `start`.
pub fn enumerate_day_keys(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<i64> {
    let first = day_key(start);
    let last = day_key(end);
    if last < first {
        return Vec::new();
    }
    (first..=last).step_by(DAY_MS as usize).collect()
}

/// Number of calendar days the window [start, end] touches, end defaulting
/// to `now` when open-ended. Never less than 1.
pub fn duration_days(start: DateTime<Utc>, end: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let end = end.unwrap_or(now);
    let span = end_of_day(end).timestamp_millis() - start_of_day(start).timestamp_millis();
    (span.div_euclid(DAY_MS) + 1).max(1)
}

/// The last fully-elapsed day eligible for cumulative scoring.
///
/// Returns the challenge end if it already lies strictly before today's
/// start; otherwise yesterday — unless yesterday precedes the challenge
/// start, in which case there are no scoreable days yet. Today's
/// still-in-progress activity never reaches the cumulative score.
pub fn resolve_scoreboard_end(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let today = start_of_day(now);
    if let Some(end) = end {
        if end < today {
            return Some(end);
        }
    }
    let yesterday = start_of_day(today - Duration::milliseconds(1));
    if yesterday < start_of_day(start) {
        None
    } else {
        Some(yesterday)
    }
}
