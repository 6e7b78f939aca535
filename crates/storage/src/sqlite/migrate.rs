use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Applies the versioned schema for section progress and learner activity.
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

    // Version 1: progress + activity.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS section_progress (
                    lesson_id INTEGER NOT NULL,
                    section_id TEXT NOT NULL,
                    section_type TEXT NOT NULL,
                    is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
                    completed_at TEXT,
                    exercises_completed INTEGER NOT NULL DEFAULT 0 CHECK (exercises_completed >= 0),
                    exercises_total INTEGER NOT NULL DEFAULT 0 CHECK (exercises_total >= 0),
                    attempts INTEGER NOT NULL DEFAULT 0 CHECK (attempts >= 0),
                    PRIMARY KEY (lesson_id, section_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS section_time (
                    lesson_id INTEGER NOT NULL,
                    section_id TEXT NOT NULL,
                    seconds INTEGER NOT NULL CHECK (seconds >= 0),
                    PRIMARY KEY (lesson_id, section_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS exercise_progress (
                    lesson_id INTEGER NOT NULL,
                    exercise_id INTEGER NOT NULL,
                    is_completed INTEGER NOT NULL CHECK (is_completed IN (0, 1)),
                    is_correct INTEGER,
                    user_answer TEXT,
                    attempts INTEGER NOT NULL CHECK (attempts >= 0),
                    first_attempt_at TEXT,
                    last_attempt_at TEXT,
                    PRIMARY KEY (lesson_id, exercise_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
