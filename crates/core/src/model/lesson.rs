use serde::{Deserialize, Serialize};

use crate::model::ids::{ConceptId, ExerciseId, LessonId};
use crate::model::section::LessonOutline;

/// Exercise attached to a concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    #[serde(default)]
    pub order_index: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
}

/// A sub-topic of a lesson with its own exercises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    pub id: ConceptId,
    #[serde(default)]
    pub order_index: u32,
    pub title: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Concept {
    #[must_use]
    pub fn exercise_ids(&self) -> Vec<ExerciseId> {
        self.exercises.iter().map(|e| e.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralExercise {
    pub id: ExerciseId,
    #[serde(default)]
    pub order_index: u32,
    #[serde(default)]
    pub problem: String,
    #[serde(default)]
    pub answers: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
}

/// Full lesson structure as served by the lesson content endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContent {
    pub id: LessonId,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub general_exercises: Vec<GeneralExercise>,
}

impl LessonContent {
    #[must_use]
    pub fn concept_ids(&self) -> Vec<ConceptId> {
        self.concepts.iter().map(|c| c.id).collect()
    }

    /// Section sequence for this lesson, in the order concepts were served.
    #[must_use]
    pub fn outline(&self) -> LessonOutline {
        LessonOutline::new(self.id, &self.concept_ids())
    }

    #[must_use]
    pub fn general_exercise_ids(&self) -> Vec<ExerciseId> {
        self.general_exercises.iter().map(|e| e.id).collect()
    }
}
