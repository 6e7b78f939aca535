use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ids::ExerciseId;
use crate::model::section::SectionId;

/// Progress on a single exercise, as tracked on the learner's device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseProgress {
    pub exercise_id: ExerciseId,
    pub is_completed: bool,
    pub is_correct: Option<bool>,
    pub user_answer: Option<String>,
    pub attempts: u32,
    pub first_attempt_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

/// One answer submitted for an exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseAttempt {
    pub exercise_id: ExerciseId,
    pub answer: String,
    pub is_correct: bool,
    pub at: DateTime<Utc>,
}

impl ExerciseProgress {
    #[must_use]
    pub fn new(exercise_id: ExerciseId) -> Self {
        Self {
            exercise_id,
            is_completed: false,
            is_correct: None,
            user_answer: None,
            attempts: 0,
            first_attempt_at: None,
            last_attempt_at: None,
        }
    }

    /// Folds an attempt in. An exercise is completed once answered correctly
    /// and stays completed on later wrong answers.
    pub fn apply(&mut self, attempt: &ExerciseAttempt) {
        self.attempts = self.attempts.saturating_add(1);
        self.first_attempt_at.get_or_insert(attempt.at);
        self.last_attempt_at = Some(attempt.at);
        self.user_answer = Some(attempt.answer.clone());
        self.is_correct = Some(attempt.is_correct);
        self.is_completed |= attempt.is_correct;
    }
}

/// Local inputs to the completion score: time per section and exercise
/// progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerActivity {
    pub section_time: BTreeMap<SectionId, u64>,
    pub exercise_progress: BTreeMap<ExerciseId, ExerciseProgress>,
}

impl LearnerActivity {
    pub fn add_time(&mut self, section: SectionId, secs: u64) {
        let entry = self.section_time.entry(section).or_insert(0);
        *entry = entry.saturating_add(secs);
    }

    pub fn record_attempt(&mut self, attempt: &ExerciseAttempt) {
        self.exercise_progress
            .entry(attempt.exercise_id)
            .or_insert_with(|| ExerciseProgress::new(attempt.exercise_id))
            .apply(attempt);
    }

    #[must_use]
    pub fn total_time_secs(&self) -> u64 {
        self.section_time.values().copied().sum()
    }

    #[must_use]
    pub fn completed_exercises(&self, ids: &[ExerciseId]) -> usize {
        ids.iter()
            .filter(|id| {
                self.exercise_progress
                    .get(id)
                    .is_some_and(|p| p.is_completed)
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn attempt(id: u64, correct: bool, offset_secs: i64) -> ExerciseAttempt {
        ExerciseAttempt {
            exercise_id: ExerciseId::new(id),
            answer: if correct { "4".into() } else { "5".into() },
            is_correct: correct,
            at: fixed_now() + chrono::Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn correct_answer_completes_and_sticks() {
        let mut activity = LearnerActivity::default();
        activity.record_attempt(&attempt(1, false, 0));
        activity.record_attempt(&attempt(1, true, 10));
        activity.record_attempt(&attempt(1, false, 20));

        let progress = &activity.exercise_progress[&ExerciseId::new(1)];
        assert_eq!(progress.attempts, 3);
        assert!(progress.is_completed);
        assert_eq!(progress.is_correct, Some(false));
        assert_eq!(progress.first_attempt_at, Some(fixed_now()));
        assert_eq!(
            progress.last_attempt_at,
            Some(fixed_now() + chrono::Duration::seconds(20))
        );
    }

    #[test]
    fn time_accumulates_per_section() {
        let mut activity = LearnerActivity::default();
        activity.add_time(SectionId::Overview, 30);
        activity.add_time(SectionId::Overview, 15);
        activity.add_time(SectionId::GeneralExercises, 5);
        assert_eq!(activity.section_time[&SectionId::Overview], 45);
        assert_eq!(activity.total_time_secs(), 50);
    }

    #[test]
    fn serializes_with_section_keys() {
        let mut activity = LearnerActivity::default();
        activity.add_time(SectionId::SummaryApplication, 12);
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["sectionTime"]["summary_application"], 12);
    }
}
