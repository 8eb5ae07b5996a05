use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Habits --

/// How a habit is measured. `Check` habits are done-or-not and always carry
/// an effective daily goal of 1; the other kinds log arbitrary amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitKind {
    Check,
    Count,
    Quantity,
    Duration,
}

impl HabitKind {
    pub fn is_check(&self) -> bool {
        matches!(self, HabitKind::Check)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "check" => Some(HabitKind::Check),
            "count" => Some(HabitKind::Count),
            "quantity" => Some(HabitKind::Quantity),
            "duration" => Some(HabitKind::Duration),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HabitKind::Check => "check",
            HabitKind::Count => "count",
            HabitKind::Quantity => "quantity",
            HabitKind::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitCategory {
    Fitness,
    Study,
    Health,
    #[default]
    Personal,
    Work,
    Creativity,
    Spirituality,
    Home,
}

impl HabitCategory {
    /// Unknown categories fall back to the default rather than erroring.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "fitness" => HabitCategory::Fitness,
            "study" => HabitCategory::Study,
            "health" => HabitCategory::Health,
            "personal" => HabitCategory::Personal,
            "work" => HabitCategory::Work,
            "creativity" => HabitCategory::Creativity,
            "spirituality" => HabitCategory::Spirituality,
            "home" => HabitCategory::Home,
            _ => HabitCategory::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HabitCategory::Fitness => "fitness",
            HabitCategory::Study => "study",
            HabitCategory::Health => "health",
            HabitCategory::Personal => "personal",
            HabitCategory::Work => "work",
            HabitCategory::Creativity => "creativity",
            HabitCategory::Spirituality => "spirituality",
            HabitCategory::Home => "home",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitColor {
    #[default]
    Zinc,
    Emerald,
    Sky,
    Amber,
    Violet,
    Rose,
    Teal,
    Indigo,
    Lime,
    Orange,
}

impl HabitColor {
    /// Unknown colors fall back to the default rather than erroring.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "zinc" => HabitColor::Zinc,
            "emerald" => HabitColor::Emerald,
            "sky" => HabitColor::Sky,
            "amber" => HabitColor::Amber,
            "violet" => HabitColor::Violet,
            "rose" => HabitColor::Rose,
            "teal" => HabitColor::Teal,
            "indigo" => HabitColor::Indigo,
            "lime" => HabitColor::Lime,
            "orange" => HabitColor::Orange,
            _ => HabitColor::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HabitColor::Zinc => "zinc",
            HabitColor::Emerald => "emerald",
            HabitColor::Sky => "sky",
            HabitColor::Amber => "amber",
            HabitColor::Violet => "violet",
            HabitColor::Rose => "rose",
            HabitColor::Teal => "teal",
            HabitColor::Indigo => "indigo",
            HabitColor::Lime => "lime",
            HabitColor::Orange => "orange",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub kind: HabitKind,
    pub unit: String,
    pub category: HabitCategory,
    pub color: HabitColor,
    pub emoji: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated, unsaved habit specification. Produced by the draft
/// normalizer; materialized into a real [`Habit`] either at challenge
/// creation (owner side) or lazily on acceptance (opponent side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitDraft {
    pub name: String,
    pub kind: HabitKind,
    pub unit: String,
    pub category: HabitCategory,
    pub color: HabitColor,
    pub emoji: String,
    pub description: Option<String>,
}

// -- Logs --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub user_id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub value: f64,
}

// -- Challenges --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Personal,
    Friend,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::Personal => "personal",
            ChallengeKind::Friend => "friend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(ChallengeKind::Personal),
            "friend" => Some(ChallengeKind::Friend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Active,
    PendingFinish,
    Finished,
    Rejected,
    Cancelled,
}

impl ChallengeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Pending => "pending",
            ChallengeStatus::Active => "active",
            ChallengeStatus::PendingFinish => "pending_finish",
            ChallengeStatus::Finished => "finished",
            ChallengeStatus::Rejected => "rejected",
            ChallengeStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChallengeStatus::Pending),
            "active" => Some(ChallengeStatus::Active),
            "pending_finish" => Some(ChallengeStatus::PendingFinish),
            "finished" => Some(ChallengeStatus::Finished),
            "rejected" => Some(ChallengeStatus::Rejected),
            "cancelled" => Some(ChallengeStatus::Cancelled),
            _ => None,
        }
    }
}

/// Which side of a challenge a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Owner,
    Opponent,
}

/// Mutual-consent finish protocol, modeled as an explicit state machine so
/// that illegal flag combinations are unrepresentable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishConsent {
    #[default]
    NoOneRequested,
    OwnerRequested,
    OpponentRequested,
    Both,
}

impl FinishConsent {
    /// Register a finish request from one side. Requesting twice from the
    /// same side is a no-op.
    pub fn request(self, role: ParticipantRole) -> Self {
        match (self, role) {
            (FinishConsent::NoOneRequested, ParticipantRole::Owner) => {
                FinishConsent::OwnerRequested
            }
            (FinishConsent::NoOneRequested, ParticipantRole::Opponent) => {
                FinishConsent::OpponentRequested
            }
            (FinishConsent::OwnerRequested, ParticipantRole::Opponent) => FinishConsent::Both,
            (FinishConsent::OpponentRequested, ParticipantRole::Owner) => FinishConsent::Both,
            (state, _) => state,
        }
    }

    pub fn requested_by(&self, role: ParticipantRole) -> bool {
        match role {
            ParticipantRole::Owner => {
                matches!(self, FinishConsent::OwnerRequested | FinishConsent::Both)
            }
            ParticipantRole::Opponent => {
                matches!(self, FinishConsent::OpponentRequested | FinishConsent::Both)
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, FinishConsent::Both)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishConsent::NoOneRequested => "none",
            FinishConsent::OwnerRequested => "owner",
            FinishConsent::OpponentRequested => "opponent",
            FinishConsent::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(FinishConsent::NoOneRequested),
            "owner" => Some(FinishConsent::OwnerRequested),
            "opponent" => Some(FinishConsent::OpponentRequested),
            "both" => Some(FinishConsent::Both),
            _ => None,
        }
    }
}

/// Where a discipline's habit comes from: an already-existing habit of the
/// participant, or a draft that gets materialized for them.
#[derive(Debug, Clone, PartialEq)]
pub enum HabitSource {
    Existing(Uuid),
    Draft(HabitDraft),
}

/// One habit-pair being competed within a challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discipline {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub challenger_id: Option<Uuid>,
    pub owner_habit_id: Uuid,
    pub challenger_habit_id: Option<Uuid>,
    /// Set only while a friend challenge is pending and the opponent's habit
    /// will be auto-created on acceptance.
    pub pending_challenger_habit: Option<HabitDraft>,
    pub daily_goal: f64,
    pub kind: ChallengeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub kind: ChallengeKind,
    pub status: ChallengeStatus,
    pub owner_id: Uuid,
    pub opponent_id: Option<Uuid>,
    pub initiator_id: Uuid,
    /// The user who must act next. Non-null only while `Pending`.
    pub awaiting_user_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub finish_consent: FinishConsent,
    pub disciplines: Vec<Discipline>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id || self.opponent_id == Some(user_id)
    }

    pub fn role_of(&self, user_id: Uuid) -> Option<ParticipantRole> {
        if self.owner_id == user_id {
            Some(ParticipantRole::Owner)
        } else if self.opponent_id == Some(user_id) {
            Some(ParticipantRole::Opponent)
        } else {
            None
        }
    }

    pub fn owner_wants_to_finish(&self) -> bool {
        self.finish_consent.requested_by(ParticipantRole::Owner)
    }

    pub fn opponent_wants_to_finish(&self) -> bool {
        self.finish_consent.requested_by(ParticipantRole::Opponent)
    }
}
