use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS user_progress (
            id INTEGER PRIMARY KEY,
            user_email TEXT NOT NULL UNIQUE,
            xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
            completed_lessons TEXT NOT NULL DEFAULT '[]',
            completed_quizzes TEXT NOT NULL DEFAULT '[]',
            completed_videos TEXT NOT NULL DEFAULT '[]',
            downloaded_resources TEXT NOT NULL DEFAULT '[]',
            badges TEXT NOT NULL DEFAULT '[]',
            streak_days INTEGER NOT NULL DEFAULT 0 CHECK (streak_days >= 0)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY,
            user_email TEXT NOT NULL,
            quiz_id INTEGER NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
            answers TEXT NOT NULL DEFAULT '[]',
            completed_at TEXT NOT NULL,
            CHECK (score <= total_questions)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS resources (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            xp_reward INTEGER CHECK (xp_reward >= 0),
            duration_minutes INTEGER CHECK (duration_minutes >= 0),
            kind TEXT NOT NULL,
            payload TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS meetings (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            teacher_name TEXT NOT NULL,
            teacher_title TEXT,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            meeting_link TEXT NOT NULL,
            category TEXT NOT NULL,
            meeting_type TEXT NOT NULL,
            recurring TEXT NOT NULL DEFAULT 'none'
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS meeting_registrations (
            user_email TEXT NOT NULL,
            meeting_id INTEGER NOT NULL,
            registered_at TEXT NOT NULL,
            PRIMARY KEY (user_email, meeting_id),
            FOREIGN KEY (meeting_id) REFERENCES meetings(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_quiz_attempts_user_completed
            ON quiz_attempts (user_email, completed_at, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_resources_kind_category
            ON resources (kind, category);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_meetings_date_time
            ON meetings (date, time);
    ",
];

const SCHEMA_V2: &[&str] = &[r"
    CREATE TABLE IF NOT EXISTS user_profiles (
        user_email TEXT PRIMARY KEY,
        full_name TEXT,
        theme TEXT NOT NULL DEFAULT 'light'
    );
"];

/// Applies versioned schema migrations, each in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: progress, attempts, catalog, meetings and registrations.
    // Version 2: per-user profile settings.
    for (version, statements) in [(1_i64, SCHEMA_V1), (2, SCHEMA_V2)] {
        if is_applied(pool, version).await? {
            continue;
        }
        let mut tx = pool.begin().await?;
        for statement in statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        info!(version, "applied schema migration");
    }

    Ok(())
}
