use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use stride_types::models::{
    Challenge, ChallengeKind, ChallengeStatus, Discipline, FinishConsent, Habit, HabitCategory,
    HabitColor, HabitKind, LogEntry,
};

use crate::Database;
use crate::models::{ChallengeRow, DisciplineRow, HabitRow, LogRow};

impl Database {
    // -- Users & friendships --

    pub fn create_user(&self, id: Uuid, username: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username) VALUES (?1, ?2)",
                (id.to_string(), username),
            )?;
            Ok(())
        })
    }

    pub fn get_username(&self, id: Uuid) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT username FROM users WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn add_friendship(&self, user_id: Uuid, friend_id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO friendships (user_id, friend_id) VALUES (?1, ?2)",
                (user_id.to_string(), friend_id.to_string()),
            )?;
            Ok(())
        })
    }

    /// Friendship rows are stored once; either orientation counts.
    pub fn is_friend(&self, user_id: Uuid, candidate_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friendships
                 WHERE (user_id = ?1 AND friend_id = ?2)
                    OR (user_id = ?2 AND friend_id = ?1)",
                (user_id.to_string(), candidate_id.to_string()),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Habits --

    pub fn insert_habit(&self, habit: &Habit) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO habits (id, owner_id, name, kind, unit, category, color, emoji, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    habit.id.to_string(),
                    habit.owner_id.to_string(),
                    habit.name,
                    habit.kind.as_str(),
                    habit.unit,
                    habit.category.as_str(),
                    habit.color.as_str(),
                    habit.emoji,
                    habit.description,
                    ts_to_sql(habit.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_habit(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Habit>> {
        let row = self.with_conn(|conn| query_habit(conn, id, owner_id))?;
        row.map(habit_from_row).transpose()
    }

    // -- Logs --

    pub fn insert_log(&self, log: &LogEntry) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO habit_logs (id, habit_id, user_id, logged_at, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    log.id.to_string(),
                    log.habit_id.to_string(),
                    log.user_id.to_string(),
                    ts_to_sql(log.logged_at),
                    log.value,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_logs(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogEntry>> {
        let rows = self.with_conn(|conn| query_logs(conn, user_id, habit_id, start, end))?;
        rows.into_iter().map(log_from_row).collect()
    }

    // -- Challenges --

    /// Insert a challenge and all of its disciplines in one transaction:
    /// either the whole aggregate lands or nothing does.
    pub fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO challenges (id, title, kind, status, owner_id, opponent_id,
                                         initiator_id, awaiting_user_id, start_date, end_date,
                                         finish_consent, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    challenge.id.to_string(),
                    challenge.title,
                    challenge.kind.as_str(),
                    challenge.status.as_str(),
                    challenge.owner_id.to_string(),
                    challenge.opponent_id.map(|id| id.to_string()),
                    challenge.initiator_id.to_string(),
                    challenge.awaiting_user_id.map(|id| id.to_string()),
                    ts_to_sql(challenge.start_date),
                    challenge.end_date.map(ts_to_sql),
                    challenge.finish_consent.as_str(),
                    ts_to_sql(challenge.created_at),
                ],
            )?;
            insert_disciplines(&tx, challenge)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_challenge(&self, id: Uuid) -> Result<Option<Challenge>> {
        let loaded = self.with_conn(|conn| {
            let Some(row) = query_challenge(conn, id)? else {
                return Ok(None);
            };
            let disciplines = query_disciplines(conn, &[row.id.clone()])?;
            Ok(Some((row, disciplines)))
        })?;
        loaded
            .map(|(row, disciplines)| challenge_from_row(row, disciplines))
            .transpose()
    }

    /// Rewrite the challenge header and replace its discipline set wholesale
    /// in one transaction.
    pub fn update_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "UPDATE challenges
                 SET title = ?2, status = ?3, initiator_id = ?4, awaiting_user_id = ?5,
                     start_date = ?6, end_date = ?7, finish_consent = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    challenge.id.to_string(),
                    challenge.title,
                    challenge.status.as_str(),
                    challenge.initiator_id.to_string(),
                    challenge.awaiting_user_id.map(|id| id.to_string()),
                    ts_to_sql(challenge.start_date),
                    challenge.end_date.map(ts_to_sql),
                    challenge.finish_consent.as_str(),
                ],
            )?;
            tx.execute(
                "DELETE FROM disciplines WHERE challenge_id = ?1",
                [challenge.id.to_string()],
            )?;
            insert_disciplines(&tx, challenge)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// FK cascade takes the disciplines down with the challenge.
    pub fn delete_challenge(&self, id: Uuid) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM challenges WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    pub fn list_challenges(
        &self,
        user_id: Uuid,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<Challenge>> {
        let (rows, discipline_rows) = self.with_conn(|conn| {
            let rows = query_challenges_for_user(conn, user_id, status)?;
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let disciplines = query_disciplines(conn, &ids)?;
            Ok((rows, disciplines))
        })?;

        // Group disciplines by challenge id, preserving position order.
        let mut grouped: std::collections::HashMap<String, Vec<DisciplineRow>> =
            std::collections::HashMap::new();
        for d in discipline_rows {
            grouped.entry(d.challenge_id.clone()).or_default().push(d);
        }

        rows.into_iter()
            .map(|row| {
                let disciplines = grouped.remove(&row.id).unwrap_or_default();
                challenge_from_row(row, disciplines)
            })
            .collect()
    }

    pub fn count_disciplines(&self, challenge_id: Uuid) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM disciplines WHERE challenge_id = ?1",
                [challenge_id.to_string()],
                |row| row.get(0),
            )?)
        })
    }
}

// -- Row queries --

fn query_habit(conn: &Connection, id: Uuid, owner_id: Uuid) -> Result<Option<HabitRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, kind, unit, category, color, emoji, description, created_at
         FROM habits WHERE id = ?1 AND owner_id = ?2",
    )?;
    stmt.query_row((id.to_string(), owner_id.to_string()), |row| {
        Ok(HabitRow {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            kind: row.get(3)?,
            unit: row.get(4)?,
            category: row.get(5)?,
            color: row.get(6)?,
            emoji: row.get(7)?,
            description: row.get(8)?,
            created_at: row.get(9)?,
        })
    })
    .optional()
}

fn query_logs(
    conn: &Connection,
    user_id: Uuid,
    habit_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<LogRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, habit_id, user_id, logged_at, value
         FROM habit_logs
         WHERE user_id = ?1 AND habit_id = ?2 AND logged_at >= ?3 AND logged_at <= ?4
         ORDER BY logged_at",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![
                user_id.to_string(),
                habit_id.to_string(),
                ts_to_sql(start),
                ts_to_sql(end),
            ],
            |row| {
                Ok(LogRow {
                    id: row.get(0)?,
                    habit_id: row.get(1)?,
                    user_id: row.get(2)?,
                    logged_at: row.get(3)?,
                    // A corrupt value reads as 0 rather than failing the query.
                    value: row.get(4).unwrap_or(0.0),
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_challenge(conn: &Connection, id: Uuid) -> Result<Option<ChallengeRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, kind, status, owner_id, opponent_id, initiator_id, awaiting_user_id,
                start_date, end_date, finish_consent, created_at
         FROM challenges WHERE id = ?1",
    )?;
    stmt.query_row([id.to_string()], map_challenge_row).optional()
}

fn query_challenges_for_user(
    conn: &Connection,
    user_id: Uuid,
    status: Option<ChallengeStatus>,
) -> Result<Vec<ChallengeRow>> {
    let base = "SELECT id, title, kind, status, owner_id, opponent_id, initiator_id,
                       awaiting_user_id, start_date, end_date, finish_consent, created_at
                FROM challenges
                WHERE (owner_id = ?1 OR opponent_id = ?1)";
    let uid = user_id.to_string();
    let mut rows = Vec::new();
    match status {
        Some(status) => {
            let sql = format!("{base} AND status = ?2 ORDER BY created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map((uid, status.as_str()), map_challenge_row)?;
            for row in mapped {
                rows.push(row?);
            }
        }
        None => {
            let sql = format!("{base} ORDER BY created_at DESC");
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map([uid], map_challenge_row)?;
            for row in mapped {
                rows.push(row?);
            }
        }
    }
    Ok(rows)
}

fn map_challenge_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChallengeRow> {
    Ok(ChallengeRow {
        id: row.get(0)?,
        title: row.get(1)?,
        kind: row.get(2)?,
        status: row.get(3)?,
        owner_id: row.get(4)?,
        opponent_id: row.get(5)?,
        initiator_id: row.get(6)?,
        awaiting_user_id: row.get(7)?,
        start_date: row.get(8)?,
        end_date: row.get(9)?,
        finish_consent: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Batch-fetch disciplines for a set of challenge ids.
fn query_disciplines(conn: &Connection, challenge_ids: &[String]) -> Result<Vec<DisciplineRow>> {
    if challenge_ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=challenge_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT id, challenge_id, owner_id, challenger_id, owner_habit_id, challenger_habit_id,
                pending_challenger_habit, daily_goal, kind
         FROM disciplines WHERE challenge_id IN ({}) ORDER BY challenge_id, position",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = challenge_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(DisciplineRow {
                id: row.get(0)?,
                challenge_id: row.get(1)?,
                owner_id: row.get(2)?,
                challenger_id: row.get(3)?,
                owner_habit_id: row.get(4)?,
                challenger_habit_id: row.get(5)?,
                pending_challenger_habit: row.get(6)?,
                daily_goal: row.get(7)?,
                kind: row.get(8)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn insert_disciplines(conn: &Connection, challenge: &Challenge) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO disciplines (id, challenge_id, position, owner_id, challenger_id,
                                  owner_habit_id, challenger_habit_id, pending_challenger_habit,
                                  daily_goal, kind)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for (position, d) in challenge.disciplines.iter().enumerate() {
        let pending = d
            .pending_challenger_habit
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        stmt.execute(rusqlite::params![
            d.id.to_string(),
            challenge.id.to_string(),
            position as i64,
            d.owner_id.to_string(),
            d.challenger_id.map(|id| id.to_string()),
            d.owner_habit_id.to_string(),
            d.challenger_habit_id.map(|id| id.to_string()),
            pending,
            d.daily_goal,
            d.kind.as_str(),
        ])?;
    }
    Ok(())
}

// -- Row → domain conversion --

fn habit_from_row(row: HabitRow) -> Result<Habit> {
    Ok(Habit {
        id: parse_uuid(&row.id, "habit id")?,
        owner_id: parse_uuid(&row.owner_id, "habit owner")?,
        name: row.name,
        kind: HabitKind::parse(&row.kind)
            .ok_or_else(|| anyhow!("Unknown habit kind: {}", row.kind))?,
        unit: row.unit,
        category: HabitCategory::parse_or_default(&row.category),
        color: HabitColor::parse_or_default(&row.color),
        emoji: row.emoji,
        description: row.description,
        created_at: ts_from_sql(&row.created_at)?,
    })
}

fn log_from_row(row: LogRow) -> Result<LogEntry> {
    Ok(LogEntry {
        id: parse_uuid(&row.id, "log id")?,
        habit_id: parse_uuid(&row.habit_id, "log habit")?,
        user_id: parse_uuid(&row.user_id, "log user")?,
        logged_at: ts_from_sql(&row.logged_at)?,
        value: row.value,
    })
}

fn discipline_from_row(row: DisciplineRow) -> Result<Discipline> {
    let pending = row
        .pending_challenger_habit
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("Corrupt pending challenger habit")?;
    Ok(Discipline {
        id: parse_uuid(&row.id, "discipline id")?,
        owner_id: parse_uuid(&row.owner_id, "discipline owner")?,
        challenger_id: parse_opt_uuid(row.challenger_id.as_deref(), "discipline challenger")?,
        owner_habit_id: parse_uuid(&row.owner_habit_id, "discipline owner habit")?,
        challenger_habit_id: parse_opt_uuid(
            row.challenger_habit_id.as_deref(),
            "discipline challenger habit",
        )?,
        pending_challenger_habit: pending,
        daily_goal: row.daily_goal,
        kind: ChallengeKind::parse(&row.kind)
            .ok_or_else(|| anyhow!("Unknown challenge kind: {}", row.kind))?,
    })
}

fn challenge_from_row(
    row: ChallengeRow,
    discipline_rows: Vec<DisciplineRow>,
) -> Result<Challenge> {
    let disciplines = discipline_rows
        .into_iter()
        .map(discipline_from_row)
        .collect::<Result<Vec<_>>>()?;
    Ok(Challenge {
        id: parse_uuid(&row.id, "challenge id")?,
        title: row.title,
        kind: ChallengeKind::parse(&row.kind)
            .ok_or_else(|| anyhow!("Unknown challenge kind: {}", row.kind))?,
        status: ChallengeStatus::parse(&row.status)
            .ok_or_else(|| anyhow!("Unknown challenge status: {}", row.status))?,
        owner_id: parse_uuid(&row.owner_id, "challenge owner")?,
        opponent_id: parse_opt_uuid(row.opponent_id.as_deref(), "challenge opponent")?,
        initiator_id: parse_uuid(&row.initiator_id, "challenge initiator")?,
        awaiting_user_id: parse_opt_uuid(row.awaiting_user_id.as_deref(), "awaiting user")?,
        start_date: ts_from_sql(&row.start_date)?,
        end_date: row.end_date.as_deref().map(ts_from_sql).transpose()?,
        finish_consent: FinishConsent::parse(&row.finish_consent)
            .ok_or_else(|| anyhow!("Unknown finish consent: {}", row.finish_consent))?,
        disciplines,
        created_at: ts_from_sql(&row.created_at)?,
    })
}

// -- Scalar helpers --

fn parse_uuid(s: &str, what: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("Corrupt {what}: {s}"))
}

fn parse_opt_uuid(s: Option<&str>, what: &str) -> Result<Option<Uuid>> {
    s.map(|s| parse_uuid(s, what)).transpose()
}

fn ts_to_sql(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime('now') default stores "YYYY-MM-DD HH:MM:SS"
            // without a timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("Corrupt timestamp: {s}"))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
