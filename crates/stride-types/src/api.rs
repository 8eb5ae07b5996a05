use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Challenge, ChallengeKind, ChallengeStatus, Discipline, HabitDraft,
};

// -- JWT Claims --

/// JWT claims shared between the server middleware and anything else that
/// mints tokens. Canonical definition lives here in stride-types to
/// eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Challenge creation --

/// Raw, unvalidated habit draft as it arrives over the wire. The engine's
/// normalizer turns this into a [`HabitDraft`] or rejects it.
#[derive(Debug, Clone, Deserialize)]
pub struct HabitDraftPayload {
    pub name: String,
    pub kind: String,
    pub unit: String,
    pub category: Option<String>,
    pub color: Option<String>,
    pub emoji: Option<String>,
    pub description: Option<String>,
}

/// One discipline of a new challenge. Exactly one of `owner_habit_id` /
/// `owner_habit_draft` must be set; same for the challenger pair on friend
/// challenges.
#[derive(Debug, Clone, Deserialize)]
pub struct DisciplineInput {
    pub owner_habit_id: Option<Uuid>,
    pub owner_habit_draft: Option<HabitDraftPayload>,
    pub challenger_habit_id: Option<Uuid>,
    pub challenger_habit_draft: Option<HabitDraftPayload>,
    pub daily_goal: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChallengeRequest {
    pub title: String,
    pub kind: ChallengeKind,
    pub opponent_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub disciplines: Vec<DisciplineInput>,
}

// -- Challenge response --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondAction {
    Accept,
    Reject,
    Modify,
}

/// Counter-offer disciplines reference fully-resolved habit ids only; drafts
/// are not accepted at the modify step.
#[derive(Debug, Clone, Deserialize)]
pub struct ModifyDisciplineInput {
    pub owner_habit_id: Uuid,
    pub challenger_habit_id: Uuid,
    pub daily_goal: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondRequest {
    pub action: RespondAction,
    pub disciplines: Option<Vec<ModifyDisciplineInput>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

// -- Challenge views --

#[derive(Debug, Clone, Serialize)]
pub struct DisciplineView {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub challenger_id: Option<Uuid>,
    pub owner_habit_id: Uuid,
    pub challenger_habit_id: Option<Uuid>,
    pub pending_challenger_habit: Option<HabitDraft>,
    pub daily_goal: f64,
    pub kind: ChallengeKind,
}

impl From<&Discipline> for DisciplineView {
    fn from(d: &Discipline) -> Self {
        Self {
            id: d.id,
            owner_id: d.owner_id,
            challenger_id: d.challenger_id,
            owner_habit_id: d.owner_habit_id,
            challenger_habit_id: d.challenger_habit_id,
            pending_challenger_habit: d.pending_challenger_habit.clone(),
            daily_goal: d.daily_goal,
            kind: d.kind,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeView {
    pub id: Uuid,
    pub title: String,
    pub kind: ChallengeKind,
    pub status: ChallengeStatus,
    pub owner_id: Uuid,
    pub opponent_id: Option<Uuid>,
    pub initiator_id: Uuid,
    pub awaiting_user_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner_wants_to_finish: bool,
    pub opponent_wants_to_finish: bool,
    pub disciplines: Vec<DisciplineView>,
    pub created_at: DateTime<Utc>,
}

impl From<&Challenge> for ChallengeView {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id,
            title: c.title.clone(),
            kind: c.kind,
            status: c.status,
            owner_id: c.owner_id,
            opponent_id: c.opponent_id,
            initiator_id: c.initiator_id,
            awaiting_user_id: c.awaiting_user_id,
            start_date: c.start_date,
            end_date: c.end_date,
            owner_wants_to_finish: c.owner_wants_to_finish(),
            opponent_wants_to_finish: c.opponent_wants_to_finish(),
            disciplines: c.disciplines.iter().map(DisciplineView::from).collect(),
            created_at: c.created_at,
        }
    }
}

// -- Challenge summary --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Owner,
    Opponent,
    Draw,
}

/// Per-day win/draw tallies over the scoreable range of one discipline.
/// `draws` is a sub-count: a drawn day increments both win tallies and
/// `draws` at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayTallies {
    pub owner_day_wins: u32,
    pub opponent_day_wins: u32,
    pub draws: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantInfo {
    pub id: Uuid,
    pub username: String,
}

/// Progress of one side of a discipline over the challenge window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SideProgress {
    pub total: f64,
    pub completion_ratio: f64,
    pub today_total: f64,
    pub today_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisciplineProgress {
    pub discipline_id: Uuid,
    pub owner_habit_id: Uuid,
    pub challenger_habit_id: Option<Uuid>,
    pub daily_goal: f64,
    pub target_total: f64,
    pub owner: SideProgress,
    pub opponent: Option<SideProgress>,
    pub tallies: DayTallies,
    /// Who is ahead on completion ratio right now, independent of the
    /// day-by-day scoreboard.
    pub leader: Option<Winner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChallengeSummary {
    pub id: Uuid,
    pub title: String,
    pub kind: ChallengeKind,
    pub status: ChallengeStatus,
    pub owner: ParticipantInfo,
    pub opponent: Option<ParticipantInfo>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub duration_days: i64,
    pub disciplines: Vec<DisciplineProgress>,
    pub owner_wins: u32,
    pub opponent_wins: u32,
    pub draws: u32,
    pub overall_winner: Option<Winner>,
}
