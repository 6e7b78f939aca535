//! Display model of the lesson completion page.

use std::fmt;

use lesson_core::model::{ConceptId, Grade, LessonCompletionData, display_percent};

/// Concept scores at or above this are highlighted as strong.
pub const STRONG_SCORE: f64 = 80.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ConceptRow {
    pub concept_id: ConceptId,
    pub title: String,
    pub percent: i64,
    pub strong: bool,
    pub exercises: String,
    pub weight: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneralRow {
    pub percent: i64,
    pub weight: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionView {
    pub lesson_title: String,
    pub percent: i64,
    pub grade: Grade,
    pub concepts: Vec<ConceptRow>,
    /// Present only when general exercises carry weight.
    pub general: Option<GeneralRow>,
}

impl CompletionView {
    #[must_use]
    pub fn new(data: &LessonCompletionData) -> Self {
        let concepts = data
            .concept_scores
            .iter()
            .map(|c| ConceptRow {
                concept_id: c.concept_id,
                title: c.title.clone(),
                percent: display_percent(c.score),
                strong: c.score >= STRONG_SCORE,
                exercises: format!("{}/{} exercises", c.completed_exercises, c.total_exercises),
                weight: format!("Weight: {}%", display_percent(c.weight)),
            })
            .collect();
        let general = (data.general_exercises_weight > 0.0).then(|| GeneralRow {
            percent: display_percent(data.general_exercises_score),
            weight: format!("Weight: {}%", display_percent(data.general_exercises_weight)),
        });
        let percent = display_percent(data.lesson_score);
        // Grade follows the number the learner sees.
        #[allow(clippy::cast_precision_loss)]
        let grade = Grade::from_percent(percent as f64);
        Self {
            lesson_title: data.lesson_title.clone(),
            percent,
            grade,
            concepts,
            general,
        }
    }

    #[must_use]
    pub fn score_label(&self) -> String {
        format!("{}%", self.percent)
    }

    #[must_use]
    pub fn strong_concepts(&self) -> Vec<&str> {
        self.concepts
            .iter()
            .filter(|c| c.strong)
            .map(|c| c.title.as_str())
            .collect()
    }
}

impl fmt::Display for CompletionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.lesson_title)?;
        writeln!(
            f,
            "Score: {} (grade {}: {})",
            self.score_label(),
            self.grade,
            self.grade.message()
        )?;
        for row in &self.concepts {
            let marker = if row.strong { " *" } else { "" };
            writeln!(
                f,
                "  {}: {}% ({}, {}){marker}",
                row.title, row.percent, row.exercises, row.weight
            )?;
        }
        if let Some(general) = &self.general {
            writeln!(
                f,
                "  General exercises: {}% ({})",
                general.percent, general.weight
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::ConceptScore;

    fn concept(id: u64, title: &str, score: f64, weight: f64) -> ConceptScore {
        ConceptScore {
            concept_id: ConceptId::new(id),
            title: title.into(),
            score,
            weight,
            completed_exercises: 3,
            total_exercises: 4,
        }
    }

    #[test]
    fn renders_rounded_score_and_grade() {
        let data = LessonCompletionData::from_parts(
            "Fractions",
            vec![concept(1, "Naming", 80.0, 40.0), concept(2, "Adding", 60.0, 30.0)],
            90.0,
            30.0,
        )
        .unwrap();
        let view = CompletionView::new(&data);
        assert_eq!(view.score_label(), "77%");
        assert_eq!(view.grade, Grade::C);
        assert_eq!(view.strong_concepts(), ["Naming"]);
        assert_eq!(view.concepts[0].exercises, "3/4 exercises");
        assert_eq!(view.concepts[1].weight, "Weight: 30%");
        assert!(view.general.is_some());

        let text = view.to_string();
        assert!(text.contains("Score: 77% (grade C: Good)"));
        assert!(text.contains("Naming: 80% (3/4 exercises, Weight: 40%) *"));
    }

    #[test]
    fn half_points_round_up_and_general_row_needs_weight() {
        let data = LessonCompletionData::from_parts(
            "Decimals",
            vec![concept(1, "Place value", 89.5, 100.0)],
            0.0,
            0.0,
        )
        .unwrap();
        let view = CompletionView::new(&data);
        assert_eq!(view.percent, 90);
        assert_eq!(view.grade, Grade::A);
        assert_eq!(view.concepts[0].percent, 90);
        assert!(view.general.is_none());
    }
}
