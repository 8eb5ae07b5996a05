use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use stride_types::models::LogEntry;

use crate::error::EngineResult;
use crate::store::{ChallengeStore, DateRange};
use crate::timewin::{day_key, end_of_day, start_of_day};

/// Derived view over a user's logs for one habit: the window total plus
/// per-day sums keyed by day key. Rebuilt on every scoring request, never
/// cached.
#[derive(Debug, Clone, Default)]
pub struct DailyLogSummary {
    pub total: f64,
    pub daily_totals: HashMap<i64, f64>,
}

/// Fold raw log entries into a [`DailyLogSummary`], discarding entries
/// whose value is not a positive finite number.
pub fn reduce_logs(logs: impl IntoIterator<Item = LogEntry>) -> DailyLogSummary {
    let mut summary = DailyLogSummary::default();
    for log in logs {
        if !log.value.is_finite() || log.value <= 0.0 {
            continue;
        }
        summary.total += log.value;
        *summary.daily_totals.entry(day_key(log.logged_at)).or_insert(0.0) += log.value;
    }
    summary
}

/// Fetch and reduce a user's logs for one habit over the inclusive day range
/// `[start, end]`, end defaulting to `now` when open-ended. Read-only.
pub fn aggregate_logs<S: ChallengeStore>(
    store: &S,
    user_id: Uuid,
    habit_id: Uuid,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> EngineResult<DailyLogSummary> {
    let end = end.unwrap_or(now);
    let range = DateRange {
        start: start_of_day(start),
        end: end_of_day(end),
    };
    let logs = store.find_logs(user_id, habit_id, range)?;
    Ok(reduce_logs(logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(day: u32, hour: u32, value: f64) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            habit_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            logged_at: Utc.with_ymd_and_hms(2025, 4, day, hour, 0, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn sums_per_day_and_overall() {
        let summary = reduce_logs(vec![entry(1, 8, 3.0), entry(1, 20, 2.0), entry(2, 9, 5.0)]);
        assert_eq!(summary.total, 10.0);
        assert_eq!(summary.daily_totals.len(), 2);
        let d1 = day_key(Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());
        assert_eq!(summary.daily_totals[&d1], 5.0);
    }

    #[test]
    fn ignores_non_positive_and_non_finite_values() {
        let summary = reduce_logs(vec![
            entry(1, 8, 0.0),
            entry(1, 9, -4.0),
            entry(1, 10, f64::NAN),
            entry(1, 11, 2.5),
        ]);
        assert_eq!(summary.total, 2.5);
        assert_eq!(summary.daily_totals.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_summary() {
        let summary = reduce_logs(Vec::new());
        assert_eq!(summary.total, 0.0);
        assert!(summary.daily_totals.is_empty());
    }
}
