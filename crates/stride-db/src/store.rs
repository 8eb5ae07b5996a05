use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use stride_engine::store::{ChallengeStore, DateRange};
use stride_types::models::{Challenge, ChallengeStatus, Habit, HabitDraft, LogEntry};

use crate::Database;

impl ChallengeStore for Database {
    fn find_habit(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Habit>> {
        self.get_habit(id, owner_id)
    }

    fn create_habit(&self, owner_id: Uuid, draft: &HabitDraft) -> Result<Habit> {
        let habit = Habit {
            id: Uuid::new_v4(),
            owner_id,
            name: draft.name.clone(),
            kind: draft.kind,
            unit: draft.unit.clone(),
            category: draft.category,
            color: draft.color,
            emoji: draft.emoji.clone(),
            description: draft.description.clone(),
            created_at: Utc::now(),
        };
        self.insert_habit(&habit)?;
        Ok(habit)
    }

    fn find_logs(&self, user_id: Uuid, habit_id: Uuid, range: DateRange) -> Result<Vec<LogEntry>> {
        self.get_logs(user_id, habit_id, range.start, range.end)
    }

    fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        Database::insert_challenge(self, challenge)
    }

    fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        Database::get_challenge(self, id)
    }

    fn update_challenge(&self, challenge: &Challenge) -> Result<()> {
        Database::update_challenge(self, challenge)
    }

    fn delete_challenge(&self, id: Uuid) -> Result<()> {
        Database::delete_challenge(self, id)
    }

    fn list_challenges(
        &self,
        user_id: Uuid,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>> {
        Database::list_challenges(self, user_id, status)
    }

    fn display_name(&self, user_id: Uuid) -> Result<Option<String>> {
        self.get_username(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use stride_types::models::{
        ChallengeKind, Discipline, FinishConsent, HabitCategory, HabitColor, HabitKind,
    };

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, d, h, 0, 0).unwrap()
    }

    fn seed_user(db: &Database, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        db.create_user(id, name).unwrap();
        id
    }

    fn seed_habit(db: &Database, owner_id: Uuid, kind: HabitKind, unit: &str) -> Habit {
        let draft = HabitDraft {
            name: "Morning run".to_string(),
            kind,
            unit: unit.to_string(),
            category: HabitCategory::Fitness,
            color: HabitColor::Emerald,
            emoji: "🏃".to_string(),
            description: None,
        };
        db.create_habit(owner_id, &draft).unwrap()
    }

    fn sample_challenge(db: &Database) -> (Uuid, Uuid, Challenge) {
        let owner = seed_user(db, "ada");
        let opponent = seed_user(db, "grace");
        let owner_habit = seed_habit(db, owner, HabitKind::Quantity, "km");
        let draft = HabitDraft {
            name: "Run along".to_string(),
            kind: HabitKind::Quantity,
            unit: "km".to_string(),
            category: HabitCategory::Fitness,
            color: HabitColor::Sky,
            emoji: String::new(),
            description: Some("catch me".to_string()),
        };
        let challenge_id = Uuid::new_v4();
        let challenge = Challenge {
            id: challenge_id,
            title: "July sprint".to_string(),
            kind: ChallengeKind::Friend,
            status: ChallengeStatus::Pending,
            owner_id: owner,
            opponent_id: Some(opponent),
            initiator_id: owner,
            awaiting_user_id: Some(opponent),
            start_date: at(1, 0),
            end_date: Some(at(14, 0)),
            finish_consent: FinishConsent::NoOneRequested,
            disciplines: vec![Discipline {
                id: Uuid::new_v4(),
                owner_id: owner,
                challenger_id: Some(opponent),
                owner_habit_id: owner_habit.id,
                challenger_habit_id: None,
                pending_challenger_habit: Some(draft),
                daily_goal: 3.0,
                kind: ChallengeKind::Friend,
            }],
            created_at: at(1, 0),
        };
        Database::insert_challenge(db, &challenge).unwrap();
        (owner, opponent, challenge)
    }

    #[test]
    fn challenge_roundtrip_preserves_pending_draft() {
        let db = Database::open_in_memory().unwrap();
        let (_, opponent, challenge) = sample_challenge(&db);

        let loaded = Database::get_challenge(&db, challenge.id).unwrap().unwrap();
        assert_eq!(loaded.title, "July sprint");
        assert_eq!(loaded.status, ChallengeStatus::Pending);
        assert_eq!(loaded.awaiting_user_id, Some(opponent));
        assert_eq!(loaded.start_date, at(1, 0));
        assert_eq!(loaded.end_date, Some(at(14, 0)));
        assert_eq!(loaded.disciplines.len(), 1);

        let d = &loaded.disciplines[0];
        assert_eq!(d.daily_goal, 3.0);
        let pending = d.pending_challenger_habit.as_ref().unwrap();
        assert_eq!(pending.name, "Run along");
        assert_eq!(pending.kind, HabitKind::Quantity);
        assert_eq!(pending.description.as_deref(), Some("catch me"));
    }

    #[test]
    fn update_replaces_disciplines_wholesale() {
        let db = Database::open_in_memory().unwrap();
        let (owner, opponent, mut challenge) = sample_challenge(&db);
        let replacement_habit = seed_habit(&db, owner, HabitKind::Check, "session");
        let challenger_habit = seed_habit(&db, opponent, HabitKind::Check, "session");

        challenge.disciplines = vec![Discipline {
            id: Uuid::new_v4(),
            owner_id: owner,
            challenger_id: Some(opponent),
            owner_habit_id: replacement_habit.id,
            challenger_habit_id: Some(challenger_habit.id),
            pending_challenger_habit: None,
            daily_goal: 1.0,
            kind: ChallengeKind::Friend,
        }];
        challenge.status = ChallengeStatus::Active;
        challenge.awaiting_user_id = None;
        Database::update_challenge(&db, &challenge).unwrap();

        let loaded = Database::get_challenge(&db, challenge.id).unwrap().unwrap();
        assert_eq!(loaded.status, ChallengeStatus::Active);
        assert_eq!(loaded.disciplines.len(), 1);
        assert_eq!(loaded.disciplines[0].owner_habit_id, replacement_habit.id);
        assert_eq!(Database::count_disciplines(&db, challenge.id).unwrap(), 1);
    }

    #[test]
    fn delete_cascades_to_disciplines() {
        let db = Database::open_in_memory().unwrap();
        let (_, _, challenge) = sample_challenge(&db);
        assert_eq!(Database::count_disciplines(&db, challenge.id).unwrap(), 1);

        Database::delete_challenge(&db, challenge.id).unwrap();
        assert!(Database::get_challenge(&db, challenge.id).unwrap().is_none());
        assert_eq!(Database::count_disciplines(&db, challenge.id).unwrap(), 0);
    }

    #[test]
    fn log_queries_respect_the_inclusive_range() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "ada");
        let habit = seed_habit(&db, user, HabitKind::Quantity, "km");

        for (day, value) in [(1, 2.0), (3, 4.0), (6, 8.0)] {
            db.insert_log(&LogEntry {
                id: Uuid::new_v4(),
                habit_id: habit.id,
                user_id: user,
                logged_at: at(day, 10),
                value,
            })
            .unwrap();
        }

        let logs = db.get_logs(user, habit.id, at(1, 10), at(3, 10)).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].value, 2.0);
        assert_eq!(logs[1].value, 4.0);

        let none = db.get_logs(user, habit.id, at(4, 0), at(5, 23)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn friendship_check_works_in_both_directions() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_user(&db, "ada");
        let b = seed_user(&db, "grace");
        let c = seed_user(&db, "mallory");

        db.add_friendship(a, b).unwrap();
        assert!(db.is_friend(a, b).unwrap());
        assert!(db.is_friend(b, a).unwrap());
        assert!(!db.is_friend(a, c).unwrap());
    }

    #[test]
    fn list_filters_by_status() {
        let db = Database::open_in_memory().unwrap();
        let (owner, _, challenge) = sample_challenge(&db);

        let pending = Database::list_challenges(&db, owner, Some(ChallengeStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, challenge.id);
        assert_eq!(pending[0].disciplines.len(), 1);

        let active = Database::list_challenges(&db, owner, Some(ChallengeStatus::Active)).unwrap();
        assert!(active.is_empty());

        let stranger = seed_user(&db, "mallory");
        assert!(Database::list_challenges(&db, stranger, None).unwrap().is_empty());
    }
}
