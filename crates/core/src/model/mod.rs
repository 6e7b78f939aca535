mod activity;
mod grade;
mod ids;
mod lesson;
mod progress;
mod score;
mod section;

pub use ids::{ConceptId, ExerciseId, LessonId, ParseIdError};

pub use activity::{ExerciseAttempt, ExerciseProgress, LearnerActivity};
pub use grade::Grade;
pub use lesson::{Concept, Exercise, GeneralExercise, LessonContent};
pub use progress::{ProgressSnapshot, SectionProgress};
pub use score::{
    ConceptScore, LessonCompletionData, ScoreError, WEIGHT_TOLERANCE, display_percent,
    weighted_lesson_score,
};
pub use section::{LessonOutline, Section, SectionError, SectionId, SectionType};
