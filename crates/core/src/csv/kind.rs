use std::fmt;
use std::str::FromStr;

use super::CsvError;

/// The CSV files that make up a lesson upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Lessons,
    Concepts,
    Examples,
    Exercises,
    GeneralExercises,
    CheckMarkers,
    SchemeOfWork,
}

impl UploadKind {
    /// Files required by the all-in-one lesson upload, in form order.
    pub const BULK: [UploadKind; 6] = [
        UploadKind::Lessons,
        UploadKind::Concepts,
        UploadKind::Examples,
        UploadKind::Exercises,
        UploadKind::GeneralExercises,
        UploadKind::CheckMarkers,
    ];

    #[must_use]
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            UploadKind::Lessons => &[
                "class",
                "subject",
                "term",
                "week",
                "topic",
                "overview",
                "objectives",
                "key_concepts",
                "summary",
                "application",
            ],
            UploadKind::Concepts => &["lesson", "title", "description", "order_index"],
            UploadKind::Examples => &[
                "concept",
                "title",
                "problem",
                "solution_steps",
                "answer",
                "order_index",
            ],
            UploadKind::Exercises => &[
                "concept",
                "title",
                "problem",
                "solution_steps",
                "answers",
                "correct_answer",
                "order_index",
            ],
            UploadKind::GeneralExercises => &[
                "lesson",
                "problem",
                "solution_steps",
                "answers",
                "correct_answer",
                "order_index",
            ],
            UploadKind::CheckMarkers => &[
                "lesson",
                "overview",
                "lesson_video",
                "concept_one",
                "concept_two",
                "concept_three",
                "concept_four",
                "concept_five",
                "concept_six",
                "concept_seven",
                "general_exercises",
            ],
            UploadKind::SchemeOfWork => &["subject", "class", "term", "week", "topic", "breakdown"],
        }
    }

    /// Multipart field name used by the upload endpoints.
    #[must_use]
    pub fn form_field(self) -> &'static str {
        match self {
            UploadKind::Lessons => "lessons_file",
            UploadKind::Concepts => "concepts_file",
            UploadKind::Examples => "examples_file",
            UploadKind::Exercises => "exercises_file",
            UploadKind::GeneralExercises => "general_exercises_file",
            UploadKind::CheckMarkers => "check_markers_file",
            UploadKind::SchemeOfWork => "scheme_of_work_file",
        }
    }

    /// Field name the bulk endpoint expects; check markers are singular
    /// there.
    #[must_use]
    pub fn bulk_field(self) -> &'static str {
        match self {
            UploadKind::CheckMarkers => "check_marker_file",
            other => other.form_field(),
        }
    }

    /// Human label used in validation messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            UploadKind::Lessons => "lessons file",
            UploadKind::Concepts => "concepts file",
            UploadKind::Examples => "examples file",
            UploadKind::Exercises => "exercises file",
            UploadKind::GeneralExercises => "general exercises file",
            UploadKind::CheckMarkers => "check markers file",
            UploadKind::SchemeOfWork => "scheme of work file",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UploadKind::Lessons => "lessons",
            UploadKind::Concepts => "concepts",
            UploadKind::Examples => "examples",
            UploadKind::Exercises => "exercises",
            UploadKind::GeneralExercises => "general-exercises",
            UploadKind::CheckMarkers => "check-markers",
            UploadKind::SchemeOfWork => "scheme-of-work",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadKind {
    type Err = CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        match key.as_str() {
            "lessons" => Ok(Self::Lessons),
            "concepts" => Ok(Self::Concepts),
            "examples" => Ok(Self::Examples),
            "exercises" => Ok(Self::Exercises),
            "general-exercises" => Ok(Self::GeneralExercises),
            "check-markers" => Ok(Self::CheckMarkers),
            "scheme-of-work" => Ok(Self::SchemeOfWork),
            _ => Err(CsvError::UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_and_field_spellings() {
        assert_eq!("general-exercises".parse(), Ok(UploadKind::GeneralExercises));
        assert_eq!("check_markers".parse(), Ok(UploadKind::CheckMarkers));
        assert!("videos".parse::<UploadKind>().is_err());
    }

    #[test]
    fn bulk_set_excludes_scheme_of_work() {
        assert!(!UploadKind::BULK.contains(&UploadKind::SchemeOfWork));
        assert_eq!(UploadKind::BULK[5].form_field(), "check_markers_file");
        assert_eq!(UploadKind::BULK[5].bulk_field(), "check_marker_file");
        assert_eq!(UploadKind::Lessons.bulk_field(), "lessons_file");
    }
}
