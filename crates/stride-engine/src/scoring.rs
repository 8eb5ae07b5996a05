//! Day-by-day scoring of one discipline.
//!
//! Scores are derived from goal-completion ratios rather than raw values so
//! that habits with different daily goals compare fairly within the same
//! discipline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use stride_types::api::DayTallies;
use stride_types::models::ChallengeKind;

use crate::timewin::enumerate_day_keys;

/// Two ratios within this distance of each other count as a drawn day.
/// Absorbs floating-point noise from goal division.
pub const RATIO_EPSILON: f64 = 0.01;

fn goal_ratio(value: f64, daily_goal: f64) -> f64 {
    // A non-positive goal is unattainable, not a division error.
    if daily_goal > 0.0 { value / daily_goal } else { 0.0 }
}

/// Tally per-day outcomes for one discipline over the scoreable range.
///
/// A `None` scoreboard end means no day has fully elapsed yet: all tallies
/// stay zero. Personal mode rewards meeting the goal and never penalizes a
/// miss. In friend mode a day goes to the higher completion ratio; ratios
/// within [`RATIO_EPSILON`] of each other draw (both sides score, and the
/// draw sub-count increments), and a day where neither side progressed
/// counts toward nobody.
pub fn score_discipline(
    owner_daily: &HashMap<i64, f64>,
    opponent_daily: Option<&HashMap<i64, f64>>,
    start: DateTime<Utc>,
    scoreboard_end: Option<DateTime<Utc>>,
    daily_goal: f64,
    kind: ChallengeKind,
) -> DayTallies {
    let mut tallies = DayTallies::default();
    let Some(end) = scoreboard_end else {
        return tallies;
    };

    for key in enumerate_day_keys(start, end) {
        let owner_ratio = goal_ratio(owner_daily.get(&key).copied().unwrap_or(0.0), daily_goal);

        match kind {
            ChallengeKind::Personal => {
                if owner_ratio >= 1.0 {
                    tallies.owner_day_wins += 1;
                }
            }
            ChallengeKind::Friend => {
                let opponent_value = opponent_daily
                    .and_then(|m| m.get(&key).copied())
                    .unwrap_or(0.0);
                let opponent_ratio = goal_ratio(opponent_value, daily_goal);
                let any_progress = owner_ratio > 0.0 || opponent_ratio > 0.0;

                if (owner_ratio - opponent_ratio).abs() <= RATIO_EPSILON && any_progress {
                    tallies.owner_day_wins += 1;
                    tallies.opponent_day_wins += 1;
                    tallies.draws += 1;
                } else if owner_ratio > opponent_ratio {
                    tallies.owner_day_wins += 1;
                } else if opponent_ratio > owner_ratio {
                    tallies.opponent_day_wins += 1;
                }
            }
        }
    }

    tallies
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timewin::{day_key, resolve_scoreboard_end};
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, d, h, 0, 0).unwrap()
    }

    fn daily(entries: &[(u32, f64)]) -> HashMap<i64, f64> {
        entries
            .iter()
            .map(|&(d, v)| (day_key(at(d, 0)), v))
            .collect()
    }

    #[test]
    fn personal_scores_goal_days_only() {
        // Scenario: goal 10 over a 3-day span, logs [10, 5, 12].
        let owner = daily(&[(1, 10.0), (2, 5.0), (3, 12.0)]);
        let tallies = score_discipline(
            &owner,
            None,
            at(1, 0),
            Some(at(3, 0)),
            10.0,
            ChallengeKind::Personal,
        );
        assert_eq!(tallies.owner_day_wins, 2);
        assert_eq!(tallies.opponent_day_wins, 0);
        assert_eq!(tallies.draws, 0);
    }

    #[test]
    fn friend_check_habits_draw_then_opponent_wins() {
        // Scenario: check habits (goal 1). Owner done on day 1 only; opponent
        // done on days 1 and 2.
        let owner = daily(&[(1, 1.0)]);
        let opponent = daily(&[(1, 1.0), (2, 1.0)]);
        let tallies = score_discipline(
            &owner,
            Some(&opponent),
            at(1, 0),
            Some(at(2, 0)),
            1.0,
            ChallengeKind::Friend,
        );
        assert_eq!(tallies.owner_day_wins, 1);
        assert_eq!(tallies.opponent_day_wins, 2);
        assert_eq!(tallies.draws, 1);
    }

    #[test]
    fn no_progress_days_count_toward_nobody() {
        let owner = daily(&[(2, 4.0)]);
        let opponent = daily(&[]);
        let tallies = score_discipline(
            &owner,
            Some(&opponent),
            at(1, 0),
            Some(at(3, 0)),
            4.0,
            ChallengeKind::Friend,
        );
        assert_eq!(tallies.owner_day_wins, 1);
        assert_eq!(tallies.opponent_day_wins, 0);
        assert_eq!(tallies.draws, 0);
    }

    #[test]
    fn draw_symmetry_swapping_sides_swaps_wins() {
        let a = daily(&[(1, 8.0), (2, 2.0), (3, 5.0)]);
        let b = daily(&[(1, 8.0), (2, 6.0)]);
        let fwd = score_discipline(&a, Some(&b), at(1, 0), Some(at(3, 0)), 8.0, ChallengeKind::Friend);
        let rev = score_discipline(&b, Some(&a), at(1, 0), Some(at(3, 0)), 8.0, ChallengeKind::Friend);
        assert_eq!(fwd.owner_day_wins, rev.opponent_day_wins);
        assert_eq!(fwd.opponent_day_wins, rev.owner_day_wins);
        assert_eq!(fwd.draws, rev.draws);
    }

    #[test]
    fn personal_win_is_monotonic_in_day_value() {
        let below = daily(&[(1, 9.0)]);
        let at_goal = daily(&[(1, 10.0)]);
        let above = daily(&[(1, 15.0)]);
        let score = |m: &HashMap<i64, f64>| {
            score_discipline(m, None, at(1, 0), Some(at(1, 0)), 10.0, ChallengeKind::Personal)
                .owner_day_wins
        };
        assert_eq!(score(&below), 0);
        assert_eq!(score(&at_goal), 1);
        assert_eq!(score(&above), 1);
    }

    #[test]
    fn near_equal_ratios_draw_within_epsilon() {
        // 100.0 vs 100.9 at goal 100 → ratios 1.0 vs 1.009, inside epsilon.
        let owner = daily(&[(1, 100.0)]);
        let opponent = daily(&[(1, 100.9)]);
        let tallies = score_discipline(
            &owner,
            Some(&opponent),
            at(1, 0),
            Some(at(1, 0)),
            100.0,
            ChallengeKind::Friend,
        );
        assert_eq!(tallies.draws, 1);
        assert_eq!(tallies.owner_day_wins, 1);
        assert_eq!(tallies.opponent_day_wins, 1);
    }

    #[test]
    fn ratios_outside_epsilon_decide_the_day() {
        let owner = daily(&[(1, 100.0)]);
        let opponent = daily(&[(1, 102.0)]);
        let tallies = score_discipline(
            &owner,
            Some(&opponent),
            at(1, 0),
            Some(at(1, 0)),
            100.0,
            ChallengeKind::Friend,
        );
        assert_eq!(tallies.draws, 0);
        assert_eq!(tallies.owner_day_wins, 0);
        assert_eq!(tallies.opponent_day_wins, 1);
    }

    #[test]
    fn none_scoreboard_end_scores_nothing() {
        let owner = daily(&[(1, 10.0)]);
        let tallies =
            score_discipline(&owner, None, at(1, 0), None, 10.0, ChallengeKind::Personal);
        assert_eq!(tallies, DayTallies::default());
    }

    #[test]
    fn todays_logs_never_reach_the_scoreboard() {
        // All activity happens "today": the resolved scoreboard end excludes
        // it, so a met goal still scores zero.
        let now = at(1, 22);
        let owner = daily(&[(1, 10.0)]);
        let end = resolve_scoreboard_end(at(1, 6), None, now);
        assert!(end.is_none());
        let tallies = score_discipline(&owner, None, at(1, 6), end, 10.0, ChallengeKind::Personal);
        assert_eq!(tallies.owner_day_wins, 0);
    }

    #[test]
    fn non_positive_goal_is_unattainable_not_a_crash() {
        let owner = daily(&[(1, 5.0)]);
        let opponent = daily(&[(1, 3.0)]);
        let personal =
            score_discipline(&owner, None, at(1, 0), Some(at(1, 0)), 0.0, ChallengeKind::Personal);
        assert_eq!(personal.owner_day_wins, 0);

        // Both ratios forced to 0 → no progress → nobody scores.
        let friend = score_discipline(
            &owner,
            Some(&opponent),
            at(1, 0),
            Some(at(1, 0)),
            -2.0,
            ChallengeKind::Friend,
        );
        assert_eq!(friend, DayTallies::default());
    }
}
