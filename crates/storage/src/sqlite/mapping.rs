use chrono::{DateTime, Utc};
use lesson_core::model::{
    ExerciseId, ExerciseProgress, LessonId, SectionId, SectionProgress, SectionType,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn lesson_id_to_i64(id: LessonId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("lesson_id overflow".into()))
}

pub(crate) fn exercise_id_to_i64(id: ExerciseId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("exercise_id overflow".into()))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn parse_section_id(raw: &str) -> Result<SectionId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<SectionProgress, StorageError> {
    let section_id = parse_section_id(&row.try_get::<String, _>("section_id").map_err(ser)?)?;
    let section_type: SectionType = row
        .try_get::<String, _>("section_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    if section_type != section_id.section_type() {
        return Err(StorageError::Serialization(format!(
            "section {section_id} stored with type {section_type}"
        )));
    }

    Ok(SectionProgress {
        section_id,
        section_type,
        is_completed: row.try_get::<i64, _>("is_completed").map_err(ser)? != 0,
        completed_at: row.try_get("completed_at").map_err(ser)?,
        exercises_completed: i64_to_u32(
            "exercises_completed",
            row.try_get("exercises_completed").map_err(ser)?,
        )?,
        exercises_total: i64_to_u32(
            "exercises_total",
            row.try_get("exercises_total").map_err(ser)?,
        )?,
        attempts: i64_to_u32("attempts", row.try_get("attempts").map_err(ser)?)?,
    })
}

pub(crate) fn map_exercise_row(row: &SqliteRow) -> Result<ExerciseProgress, StorageError> {
    let exercise_id = ExerciseId::new(i64_to_u64(
        "exercise_id",
        row.try_get("exercise_id").map_err(ser)?,
    )?);
    let is_correct: Option<i64> = row.try_get("is_correct").map_err(ser)?;
    let first_attempt_at: Option<DateTime<Utc>> = row.try_get("first_attempt_at").map_err(ser)?;
    let last_attempt_at: Option<DateTime<Utc>> = row.try_get("last_attempt_at").map_err(ser)?;

    Ok(ExerciseProgress {
        exercise_id,
        is_completed: row.try_get::<i64, _>("is_completed").map_err(ser)? != 0,
        is_correct: is_correct.map(|v| v != 0),
        user_answer: row.try_get("user_answer").map_err(ser)?,
        attempts: i64_to_u32("attempts", row.try_get("attempts").map_err(ser)?)?,
        first_attempt_at,
        last_attempt_at,
    })
}
