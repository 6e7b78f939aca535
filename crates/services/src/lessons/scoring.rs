use std::sync::Arc;

use tracing::{debug, warn};

use lesson_core::model::{LessonCompletionData, LessonContent, LessonId};
use storage::repository::ActivityRepository;

use crate::api::LessonApi;
use crate::error::ScoringError;

/// Builds `LessonCompletionData` from server scores and local activity.
#[derive(Clone)]
pub struct ScoreAggregator {
    api: Arc<dyn LessonApi>,
    activity: Arc<dyn ActivityRepository>,
}

impl ScoreAggregator {
    #[must_use]
    pub fn new(api: Arc<dyn LessonApi>, activity: Arc<dyn ActivityRepository>) -> Self {
        Self { api, activity }
    }

    /// Fetches lesson content, then the completion breakdown, and recomputes
    /// the weighted lesson score locally.
    ///
    /// # Errors
    ///
    /// Returns `ScoringError::ContentUnavailable` or
    /// `ScoringError::CompletionData` when the respective request fails,
    /// `ScoringError::Score` for out-of-range scores and
    /// `ScoringError::Storage` if activity cannot be read.
    pub async fn aggregate(&self, lesson_id: LessonId) -> Result<LessonCompletionData, ScoringError> {
        let content = self
            .api
            .get_lesson_content_by_id(lesson_id)
            .await
            .map_err(|err| ScoringError::ContentUnavailable {
                message: err.user_message("Failed to load lesson content"),
            })?;
        self.aggregate_with(&content).await
    }

    /// Same as [`ScoreAggregator::aggregate`] for content already in hand.
    ///
    /// # Errors
    ///
    /// See [`ScoreAggregator::aggregate`].
    pub async fn aggregate_with(
        &self,
        content: &LessonContent,
    ) -> Result<LessonCompletionData, ScoringError> {
        let lesson_id = content.id;
        let activity = self.activity.activity(lesson_id).await?;
        let breakdown = self
            .api
            .get_lesson_completion_data(lesson_id, content, &activity)
            .await
            .map_err(|err| ScoringError::CompletionData {
                message: err.user_message("Failed to load completion data"),
            })?;

        let title = if breakdown.lesson_title.trim().is_empty() {
            content.topic.clone()
        } else {
            breakdown.lesson_title
        };
        let data = LessonCompletionData::from_parts(
            title,
            breakdown.concept_scores,
            breakdown.general_exercises_score,
            breakdown.general_exercises_weight,
        )?;

        if !data.weights_balanced() {
            warn!(
                lesson_id = %lesson_id,
                total_weight = data.total_weight(),
                "completion weights do not add up to 100"
            );
        }
        if let Some(reported) = breakdown.lesson_score {
            if (reported - data.lesson_score).abs() > f64::EPSILON * 100.0 {
                debug!(
                    lesson_id = %lesson_id,
                    reported,
                    computed = data.lesson_score,
                    "server lesson score differs from computed score"
                );
            }
        }
        Ok(data)
    }
}
