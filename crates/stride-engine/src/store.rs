use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use stride_types::models::{Challenge, ChallengeStatus, Habit, HabitDraft, LogEntry};

/// Inclusive instant range used for log queries.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The narrow persistence interface the engine consumes. Implemented by the
/// SQLite layer in production and by in-memory doubles in tests.
///
/// Mutating methods that touch a challenge and its disciplines must be
/// atomic: either the whole aggregate commits or nothing does. The engine
/// assumes it holds a consistent, exclusively-held view of the entities it
/// mutates for the duration of one call.
pub trait ChallengeStore {
    fn find_habit(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Habit>>;

    /// Materialize a draft into a real habit owned by `owner_id` and append
    /// it to that user's habit list.
    fn create_habit(&self, owner_id: Uuid, draft: &HabitDraft) -> Result<Habit>;

    fn find_logs(&self, user_id: Uuid, habit_id: Uuid, range: DateRange) -> Result<Vec<LogEntry>>;

    /// Persist a new challenge together with all of its disciplines.
    fn insert_challenge(&self, challenge: &Challenge) -> Result<()>;

    fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>>;

    /// Persist the challenge header and replace its discipline set wholesale.
    fn update_challenge(&self, challenge: &Challenge) -> Result<()>;

    /// Remove a challenge and cascade-delete its disciplines.
    fn delete_challenge(&self, id: Uuid) -> Result<()>;

    fn list_challenges(
        &self,
        user_id: Uuid,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>>;

    fn display_name(&self, user_id: Uuid) -> Result<Option<String>>;
}
