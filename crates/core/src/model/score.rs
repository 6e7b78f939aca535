use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ConceptId;

/// Allowed drift of the weight total away from 100.
pub const WEIGHT_TOLERANCE: f64 = 0.5;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("{field} must be within 0..=100, got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Score and weight of one concept in a completed lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptScore {
    pub concept_id: ConceptId,
    pub title: String,
    pub score: f64,
    pub weight: f64,
    #[serde(default)]
    pub completed_exercises: u32,
    #[serde(default)]
    pub total_exercises: u32,
}

/// Result view of a completed lesson.
///
/// `lesson_score` keeps full precision; round only when rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletionData {
    pub lesson_title: String,
    pub lesson_score: f64,
    pub concept_scores: Vec<ConceptScore>,
    pub general_exercises_score: f64,
    pub general_exercises_weight: f64,
}

impl LessonCompletionData {
    /// Builds the completion view and derives `lesson_score` from its parts.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::OutOfRange` if any score or weight is outside
    /// `0..=100` or not a number.
    pub fn from_parts(
        lesson_title: impl Into<String>,
        concept_scores: Vec<ConceptScore>,
        general_exercises_score: f64,
        general_exercises_weight: f64,
    ) -> Result<Self, ScoreError> {
        for concept in &concept_scores {
            check_percent("concept score", concept.score)?;
            check_percent("concept weight", concept.weight)?;
        }
        check_percent("general exercises score", general_exercises_score)?;
        check_percent("general exercises weight", general_exercises_weight)?;

        let lesson_score = weighted_lesson_score(
            &concept_scores,
            general_exercises_score,
            general_exercises_weight,
        );
        Ok(Self {
            lesson_title: lesson_title.into(),
            lesson_score,
            concept_scores,
            general_exercises_score,
            general_exercises_weight,
        })
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.concept_scores.iter().map(|c| c.weight).sum::<f64>() + self.general_exercises_weight
    }

    /// True when concept weights plus the general weight add up to ~100.
    #[must_use]
    pub fn weights_balanced(&self) -> bool {
        (self.total_weight() - 100.0).abs() <= WEIGHT_TOLERANCE
    }
}

/// `Σ(score_i × weight_i)/100 + general × general_weight/100`.
#[must_use]
pub fn weighted_lesson_score(
    concepts: &[ConceptScore],
    general_score: f64,
    general_weight: f64,
) -> f64 {
    let concept_part: f64 = concepts.iter().map(|c| c.score * c.weight).sum();
    (concept_part + general_score * general_weight) / 100.0
}

/// Rounds a percentage to a whole number, halves going up.
#[must_use]
pub fn display_percent(value: f64) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let rounded = (value + 0.5).floor() as i64;
    rounded
}

fn check_percent(field: &'static str, value: f64) -> Result<(), ScoreError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ScoreError::OutOfRange { field, value })
    }
}
