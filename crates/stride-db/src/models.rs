/// Database row types — these map directly to SQLite rows.
/// Distinct from the stride-types domain models to keep the DB layer
/// independent; conversion happens in `queries`.

pub struct HabitRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub kind: String,
    pub unit: String,
    pub category: String,
    pub color: String,
    pub emoji: String,
    pub description: Option<String>,
    pub created_at: String,
}

pub struct LogRow {
    pub id: String,
    pub habit_id: String,
    pub user_id: String,
    pub logged_at: String,
    pub value: f64,
}

pub struct ChallengeRow {
    pub id: String,
    pub title: String,
    pub kind: String,
    pub status: String,
    pub owner_id: String,
    pub opponent_id: Option<String>,
    pub initiator_id: String,
    pub awaiting_user_id: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub finish_consent: String,
    pub created_at: String,
}

pub struct DisciplineRow {
    pub id: String,
    pub challenge_id: String,
    pub owner_id: String,
    pub challenger_id: Option<String>,
    pub owner_habit_id: String,
    pub challenger_habit_id: Option<String>,
    pub pending_challenger_habit: Option<String>,
    pub daily_goal: f64,
    pub kind: String,
}
