use chrono::{DateTime, Utc};
use lesson_core::model::{LessonId, ProgressSnapshot, SectionId};

use super::SqliteRepository;
use super::mapping::{conn, lesson_id_to_i64, map_progress_row};
use crate::repository::{SectionProgressStore, StorageError};

#[async_trait::async_trait]
impl SectionProgressStore for SqliteRepository {
    async fn snapshot(&self, lesson_id: LessonId) -> Result<ProgressSnapshot, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT section_id, section_type, is_completed, completed_at,
                       exercises_completed, exercises_total, attempts
                FROM section_progress
                WHERE lesson_id = ?1
            ",
        )
        .bind(lesson_id_to_i64(lesson_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let records = rows
            .iter()
            .map(map_progress_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ProgressSnapshot::new(records))
    }

    async fn record_visit(
        &self,
        lesson_id: LessonId,
        section: SectionId,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO section_progress (lesson_id, section_id, section_type, is_completed, attempts)
                VALUES (?1, ?2, ?3, 0, 1)
                ON CONFLICT(lesson_id, section_id) DO UPDATE SET
                    attempts = attempts + 1
            ",
        )
        .bind(lesson_id_to_i64(lesson_id)?)
        .bind(section.to_string())
        .bind(section.section_type().as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn mark_completed(
        &self,
        lesson_id: LessonId,
        section: SectionId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO section_progress (lesson_id, section_id, section_type, is_completed, completed_at)
                VALUES (?1, ?2, ?3, 1, ?4)
                ON CONFLICT(lesson_id, section_id) DO UPDATE SET
                    is_completed = 1,
                    completed_at = COALESCE(section_progress.completed_at, excluded.completed_at)
            ",
        )
        .bind(lesson_id_to_i64(lesson_id)?)
        .bind(section.to_string())
        .bind(section.section_type().as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn clear_lesson(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM section_progress WHERE lesson_id = ?1")
            .bind(lesson_id_to_i64(lesson_id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
