use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{
    ExerciseAttempt, LearnerActivity, LessonId, ProgressSnapshot, SectionId, SectionProgress,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Process-wide section completion state, keyed by lesson.
///
/// Callers read `snapshot` immediately before every completeness decision.
#[async_trait]
pub trait SectionProgressStore: Send + Sync {
    /// Freshest copy of the lesson's section progress.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn snapshot(&self, lesson_id: LessonId) -> Result<ProgressSnapshot, StorageError>;

    /// Create the section's record if missing and bump its visit counter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn record_visit(&self, lesson_id: LessonId, section: SectionId)
    -> Result<(), StorageError>;

    /// Mark a section completed. Completing twice keeps the first timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn mark_completed(
        &self,
        lesson_id: LessonId,
        section: SectionId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Drop all section progress for a lesson when its session ends.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be removed.
    async fn clear_lesson(&self, lesson_id: LessonId) -> Result<(), StorageError>;
}

/// Time tracking and exercise progress used as scoring inputs.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn activity(&self, lesson_id: LessonId) -> Result<LearnerActivity, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the time cannot be recorded.
    async fn add_section_time(
        &self,
        lesson_id: LessonId,
        section: SectionId,
        secs: u64,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be recorded.
    async fn record_attempt(
        &self,
        lesson_id: LessonId,
        attempt: &ExerciseAttempt,
    ) -> Result<(), StorageError>;
}

/// In-memory store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<LessonId, HashMap<SectionId, SectionProgress>>>>,
    activity: Arc<Mutex<HashMap<LessonId, LearnerActivity>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SectionProgressStore for InMemoryRepository {
    async fn snapshot(&self, lesson_id: LessonId) -> Result<ProgressSnapshot, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let records = guard
            .get(&lesson_id)
            .map(|sections| sections.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        Ok(ProgressSnapshot::new(records))
    }

    async fn record_visit(
        &self,
        lesson_id: LessonId,
        section: SectionId,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let record = guard
            .entry(lesson_id)
            .or_default()
            .entry(section)
            .or_insert_with(|| SectionProgress::visited(section));
        record.attempts = record.attempts.saturating_add(1);
        Ok(())
    }

    async fn mark_completed(
        &self,
        lesson_id: LessonId,
        section: SectionId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard
            .entry(lesson_id)
            .or_default()
            .entry(section)
            .or_insert_with(|| SectionProgress::visited(section))
            .complete(at);
        Ok(())
    }

    async fn clear_lesson(&self, lesson_id: LessonId) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.remove(&lesson_id);
        Ok(())
    }
}

#[async_trait]
impl ActivityRepository for InMemoryRepository {
    async fn activity(&self, lesson_id: LessonId) -> Result<LearnerActivity, StorageError> {
        let guard = self.activity.lock().map_err(poisoned)?;
        Ok(guard.get(&lesson_id).cloned().unwrap_or_default())
    }

    async fn add_section_time(
        &self,
        lesson_id: LessonId,
        section: SectionId,
        secs: u64,
    ) -> Result<(), StorageError> {
        let mut guard = self.activity.lock().map_err(poisoned)?;
        guard.entry(lesson_id).or_default().add_time(section, secs);
        Ok(())
    }

    async fn record_attempt(
        &self,
        lesson_id: LessonId,
        attempt: &ExerciseAttempt,
    ) -> Result<(), StorageError> {
        let mut guard = self.activity.lock().map_err(poisoned)?;
        guard.entry(lesson_id).or_default().record_attempt(attempt);
        Ok(())
    }
}

/// Progress and activity stores behind trait objects so backends can be
/// swapped.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn SectionProgressStore>,
    pub activity: Arc<dyn ActivityRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn SectionProgressStore> = Arc::new(repo.clone());
        let activity: Arc<dyn ActivityRepository> = Arc::new(repo);
        Self { progress, activity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::{ConceptId, ExerciseId};
    use lesson_core::time::fixed_now;

    #[tokio::test]
    async fn visit_then_complete_updates_snapshot() {
        let repo = InMemoryRepository::new();
        let lesson = LessonId::new(3);
        let concept = SectionId::Concept(ConceptId::new(8));

        repo.record_visit(lesson, concept).await.unwrap();
        repo.record_visit(lesson, concept).await.unwrap();
        let before = repo.snapshot(lesson).await.unwrap();
        assert!(!before.is_completed(concept));
        assert_eq!(before.get(concept).unwrap().attempts, 2);

        repo.mark_completed(lesson, concept, fixed_now()).await.unwrap();
        let after = repo.snapshot(lesson).await.unwrap();
        assert!(after.is_completed(concept));
        assert_eq!(after.get(concept).unwrap().completed_at, Some(fixed_now()));
    }

    #[tokio::test]
    async fn lessons_are_isolated_and_clearable() {
        let repo = InMemoryRepository::new();
        repo.mark_completed(LessonId::new(1), SectionId::Overview, fixed_now())
            .await
            .unwrap();
        assert!(
            !repo
                .snapshot(LessonId::new(2))
                .await
                .unwrap()
                .is_completed(SectionId::Overview)
        );

        repo.clear_lesson(LessonId::new(1)).await.unwrap();
        assert!(
            !repo
                .snapshot(LessonId::new(1))
                .await
                .unwrap()
                .is_completed(SectionId::Overview)
        );
    }

    #[tokio::test]
    async fn activity_accumulates() {
        let storage = Storage::in_memory();
        let lesson = LessonId::new(4);
        storage
            .activity
            .add_section_time(lesson, SectionId::Overview, 40)
            .await
            .unwrap();
        storage
            .activity
            .record_attempt(
                lesson,
                &ExerciseAttempt {
                    exercise_id: ExerciseId::new(2),
                    answer: "x".into(),
                    is_correct: true,
                    at: fixed_now(),
                },
            )
            .await
            .unwrap();

        let activity = storage.activity.activity(lesson).await.unwrap();
        assert_eq!(activity.total_time_secs(), 40);
        assert!(activity.exercise_progress[&ExerciseId::new(2)].is_completed);
    }
}
