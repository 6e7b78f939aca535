use lesson_core::model::{ExerciseAttempt, ExerciseProgress, LearnerActivity, LessonId, SectionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, exercise_id_to_i64, i64_to_u64, lesson_id_to_i64, map_exercise_row, parse_section_id,
    ser, u64_to_i64,
};
use crate::repository::{ActivityRepository, StorageError};

#[async_trait::async_trait]
impl ActivityRepository for SqliteRepository {
    async fn activity(&self, lesson_id: LessonId) -> Result<LearnerActivity, StorageError> {
        let lesson = lesson_id_to_i64(lesson_id)?;
        let mut activity = LearnerActivity::default();

        let time_rows =
            sqlx::query("SELECT section_id, seconds FROM section_time WHERE lesson_id = ?1")
                .bind(lesson)
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;
        for row in &time_rows {
            let section = parse_section_id(&row.try_get::<String, _>("section_id").map_err(ser)?)?;
            let seconds = i64_to_u64("seconds", row.try_get("seconds").map_err(ser)?)?;
            activity.section_time.insert(section, seconds);
        }

        let exercise_rows = sqlx::query(
            r"
                SELECT exercise_id, is_completed, is_correct, user_answer, attempts,
                       first_attempt_at, last_attempt_at
                FROM exercise_progress
                WHERE lesson_id = ?1
            ",
        )
        .bind(lesson)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        for row in &exercise_rows {
            let progress = map_exercise_row(row)?;
            activity
                .exercise_progress
                .insert(progress.exercise_id, progress);
        }

        Ok(activity)
    }

    async fn add_section_time(
        &self,
        lesson_id: LessonId,
        section: SectionId,
        secs: u64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO section_time (lesson_id, section_id, seconds)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(lesson_id, section_id) DO UPDATE SET
                    seconds = seconds + excluded.seconds
            ",
        )
        .bind(lesson_id_to_i64(lesson_id)?)
        .bind(section.to_string())
        .bind(u64_to_i64("seconds", secs)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn record_attempt(
        &self,
        lesson_id: LessonId,
        attempt: &ExerciseAttempt,
    ) -> Result<(), StorageError> {
        let lesson = lesson_id_to_i64(lesson_id)?;
        let exercise = exercise_id_to_i64(attempt.exercise_id)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let existing = sqlx::query(
            r"
                SELECT exercise_id, is_completed, is_correct, user_answer, attempts,
                       first_attempt_at, last_attempt_at
                FROM exercise_progress
                WHERE lesson_id = ?1 AND exercise_id = ?2
            ",
        )
        .bind(lesson)
        .bind(exercise)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn)?;

        let mut progress = match existing {
            Some(row) => map_exercise_row(&row)?,
            None => ExerciseProgress::new(attempt.exercise_id),
        };
        progress.apply(attempt);

        sqlx::query(
            r"
                INSERT INTO exercise_progress (
                    lesson_id, exercise_id, is_completed, is_correct, user_answer,
                    attempts, first_attempt_at, last_attempt_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(lesson_id, exercise_id) DO UPDATE SET
                    is_completed = excluded.is_completed,
                    is_correct = excluded.is_correct,
                    user_answer = excluded.user_answer,
                    attempts = excluded.attempts,
                    first_attempt_at = excluded.first_attempt_at,
                    last_attempt_at = excluded.last_attempt_at
            ",
        )
        .bind(lesson)
        .bind(exercise)
        .bind(i64::from(progress.is_completed))
        .bind(progress.is_correct.map(i64::from))
        .bind(progress.user_answer)
        .bind(i64::from(progress.attempts))
        .bind(progress.first_attempt_at)
        .bind(progress.last_attempt_at)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
