use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);",
    )?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE friendships (
                user_id     TEXT NOT NULL REFERENCES users(id),
                friend_id   TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, friend_id)
            );

            CREATE TABLE habits (
                id          TEXT PRIMARY KEY,
                owner_id    TEXT NOT NULL REFERENCES users(id),
                name        TEXT NOT NULL,
                kind        TEXT NOT NULL,
                unit        TEXT NOT NULL,
                category    TEXT NOT NULL,
                color       TEXT NOT NULL,
                emoji       TEXT NOT NULL DEFAULT '',
                description TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_habits_owner ON habits(owner_id);

            CREATE TABLE habit_logs (
                id          TEXT PRIMARY KEY,
                habit_id    TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                logged_at   TEXT NOT NULL,
                value       REAL NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_logs_user_habit
                ON habit_logs(user_id, habit_id, logged_at);

            CREATE TABLE challenges (
                id                TEXT PRIMARY KEY,
                title             TEXT NOT NULL,
                kind              TEXT NOT NULL,
                status            TEXT NOT NULL,
                owner_id          TEXT NOT NULL REFERENCES users(id),
                opponent_id       TEXT REFERENCES users(id),
                initiator_id      TEXT NOT NULL,
                awaiting_user_id  TEXT,
                start_date        TEXT NOT NULL,
                end_date          TEXT,
                finish_consent    TEXT NOT NULL DEFAULT 'none',
                created_at        TEXT NOT NULL
            );

            CREATE INDEX idx_challenges_owner ON challenges(owner_id);
            CREATE INDEX idx_challenges_opponent ON challenges(opponent_id);

            CREATE TABLE disciplines (
                id                       TEXT PRIMARY KEY,
                challenge_id             TEXT NOT NULL REFERENCES challenges(id) ON DELETE CASCADE,
                position                 INTEGER NOT NULL,
                owner_id                 TEXT NOT NULL,
                challenger_id            TEXT,
                owner_habit_id           TEXT NOT NULL REFERENCES habits(id),
                challenger_habit_id      TEXT REFERENCES habits(id),
                pending_challenger_habit TEXT,
                daily_goal               REAL NOT NULL,
                kind                     TEXT NOT NULL
            );

            CREATE INDEX idx_disciplines_challenge ON disciplines(challenge_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
