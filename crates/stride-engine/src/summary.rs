//! Challenge-level aggregation: folds every discipline's logs and day
//! tallies into one read-only [`ChallengeSummary`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use stride_types::api::{
    ChallengeSummary, DayTallies, DisciplineProgress, ParticipantInfo, SideProgress, Winner,
};
use stride_types::models::ChallengeKind;

use crate::error::{EngineError, EngineResult};
use crate::lifecycle::ChallengeEngine;
use crate::logs::{DailyLogSummary, aggregate_logs};
use crate::scoring::score_discipline;
use crate::store::ChallengeStore;
use crate::timewin::{day_key, duration_days, resolve_scoreboard_end, start_of_day};

impl<S: ChallengeStore> ChallengeEngine<S> {
    /// Build the full progress summary a participant sees. `now` is captured
    /// once by the caller and threaded through every day computation, so a
    /// single request can never straddle a day boundary. Read-only.
    pub fn challenge_summary(
        &self,
        challenge_id: Uuid,
        viewer_id: Uuid,
        now: DateTime<Utc>,
    ) -> EngineResult<ChallengeSummary> {
        let challenge = self.load(challenge_id)?;
        if !challenge.is_participant(viewer_id) {
            return Err(EngineError::Forbidden("not a participant"));
        }

        let duration = duration_days(challenge.start_date, challenge.end_date, now);
        let active_end = match challenge.end_date {
            Some(end) => now.min(end),
            None => now,
        };
        // "Today" for display purposes; distinct from the cumulative
        // scoreboard end, which only admits fully elapsed days.
        let progress_key = day_key(active_end.min(start_of_day(now)));
        let scoreboard_end = resolve_scoreboard_end(challenge.start_date, challenge.end_date, now);

        let mut disciplines = Vec::with_capacity(challenge.disciplines.len());
        let mut totals = DayTallies::default();

        for d in &challenge.disciplines {
            let owner_logs = aggregate_logs(
                self.store(),
                d.owner_id,
                d.owner_habit_id,
                challenge.start_date,
                Some(active_end),
                now,
            )?;
            let opponent_logs = match (d.kind, d.challenger_id, d.challenger_habit_id) {
                (ChallengeKind::Friend, Some(user_id), Some(habit_id)) => Some(aggregate_logs(
                    self.store(),
                    user_id,
                    habit_id,
                    challenge.start_date,
                    Some(active_end),
                    now,
                )?),
                _ => None,
            };

            let target_total = d.daily_goal * duration as f64;
            let owner = side_progress(&owner_logs, target_total, d.daily_goal, progress_key);
            let opponent = opponent_logs
                .as_ref()
                .map(|logs| side_progress(logs, target_total, d.daily_goal, progress_key));

            let tallies = score_discipline(
                &owner_logs.daily_totals,
                opponent_logs.as_ref().map(|l| &l.daily_totals),
                challenge.start_date,
                scoreboard_end,
                d.daily_goal,
                d.kind,
            );

            let leader = discipline_leader(d.kind, &owner, opponent.as_ref(), target_total);

            totals.owner_day_wins += tallies.owner_day_wins;
            totals.opponent_day_wins += tallies.opponent_day_wins;
            totals.draws += tallies.draws;

            disciplines.push(DisciplineProgress {
                discipline_id: d.id,
                owner_habit_id: d.owner_habit_id,
                challenger_habit_id: d.challenger_habit_id,
                daily_goal: d.daily_goal,
                target_total,
                owner,
                opponent,
                tallies,
                leader,
            });
        }

        let overall_winner = overall_winner(&totals);

        let owner = self.participant(challenge.owner_id)?;
        let opponent = match challenge.opponent_id {
            Some(id) => Some(self.participant(id)?),
            None => None,
        };

        Ok(ChallengeSummary {
            id: challenge.id,
            title: challenge.title.clone(),
            kind: challenge.kind,
            status: challenge.status,
            owner,
            opponent,
            start_date: challenge.start_date,
            end_date: challenge.end_date,
            duration_days: duration,
            disciplines,
            owner_wins: totals.owner_day_wins,
            opponent_wins: totals.opponent_day_wins,
            draws: totals.draws,
            overall_winner,
        })
    }

    fn participant(&self, user_id: Uuid) -> EngineResult<ParticipantInfo> {
        let username = self
            .store()
            .display_name(user_id)?
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ParticipantInfo { id: user_id, username })
    }
}

fn side_progress(
    logs: &DailyLogSummary,
    target_total: f64,
    daily_goal: f64,
    progress_key: i64,
) -> SideProgress {
    let completion_ratio = if target_total > 0.0 {
        logs.total / target_total
    } else {
        0.0
    };
    let today_total = logs.daily_totals.get(&progress_key).copied().unwrap_or(0.0);
    let today_ratio = if daily_goal > 0.0 {
        today_total / daily_goal
    } else {
        0.0
    };
    SideProgress {
        total: logs.total,
        completion_ratio,
        today_total,
        today_ratio,
    }
}

/// Who is ahead on a discipline right now. Personal disciplines only ever
/// name the owner, and only once the window target is met. Friend
/// disciplines compare completion ratios, break ties on raw totals, and call
/// a full tie a draw.
fn discipline_leader(
    kind: ChallengeKind,
    owner: &SideProgress,
    opponent: Option<&SideProgress>,
    target_total: f64,
) -> Option<Winner> {
    match kind {
        ChallengeKind::Personal => {
            if owner.total >= target_total {
                Some(Winner::Owner)
            } else {
                None
            }
        }
        ChallengeKind::Friend => {
            let opponent = opponent?;
            match owner
                .completion_ratio
                .total_cmp(&opponent.completion_ratio)
                .then(owner.total.total_cmp(&opponent.total))
            {
                Ordering::Greater => Some(Winner::Owner),
                Ordering::Less => Some(Winner::Opponent),
                Ordering::Equal => Some(Winner::Draw),
            }
        }
    }
}

fn overall_winner(totals: &DayTallies) -> Option<Winner> {
    if totals.owner_day_wins > totals.opponent_day_wins {
        Some(Winner::Owner)
    } else if totals.opponent_day_wins > totals.owner_day_wins {
        Some(Winner::Opponent)
    } else if totals.owner_day_wins + totals.opponent_day_wins + totals.draws > 0 {
        Some(Winner::Draw)
    } else {
        None
    }
}
