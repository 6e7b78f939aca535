use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ConceptId, LessonId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionError {
    #[error("unknown section id: {0}")]
    UnknownId(String),

    #[error("unknown section type: {0}")]
    UnknownType(String),
}

//
// ─── SECTION TYPE ──────────────────────────────────────────────────────────────
//

/// Kind of step in a lesson sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Overview,
    Concept,
    SummaryApplication,
    GeneralExercises,
}

impl SectionType {
    pub const ALL: [SectionType; 4] = [
        SectionType::Overview,
        SectionType::Concept,
        SectionType::SummaryApplication,
        SectionType::GeneralExercises,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionType::Overview => "overview",
            SectionType::Concept => "concept",
            SectionType::SummaryApplication => "summary_application",
            SectionType::GeneralExercises => "general_exercises",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Self::Overview),
            "concept" => Ok(Self::Concept),
            "summary_application" => Ok(Self::SummaryApplication),
            "general_exercises" => Ok(Self::GeneralExercises),
            other => Err(SectionError::UnknownType(other.to_string())),
        }
    }
}

//
// ─── SECTION ID ────────────────────────────────────────────────────────────────
//

/// Stable key of a section: `overview`, `concept_<id>`, `summary_application`
/// or `general_exercises`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionId {
    Overview,
    Concept(ConceptId),
    SummaryApplication,
    GeneralExercises,
}

const CONCEPT_PREFIX: &str = "concept_";

impl SectionId {
    #[must_use]
    pub fn section_type(self) -> SectionType {
        match self {
            SectionId::Overview => SectionType::Overview,
            SectionId::Concept(_) => SectionType::Concept,
            SectionId::SummaryApplication => SectionType::SummaryApplication,
            SectionId::GeneralExercises => SectionType::GeneralExercises,
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionId::Concept(id) => write!(f, "{CONCEPT_PREFIX}{id}"),
            other => f.write_str(other.section_type().as_str()),
        }
    }
}

impl FromStr for SectionId {
    type Err = SectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overview" => Ok(Self::Overview),
            "summary_application" => Ok(Self::SummaryApplication),
            "general_exercises" => Ok(Self::GeneralExercises),
            other => other
                .strip_prefix(CONCEPT_PREFIX)
                .and_then(|raw| raw.parse::<ConceptId>().ok())
                .map(Self::Concept)
                .ok_or_else(|| SectionError::UnknownId(other.to_string())),
        }
    }
}

impl Serialize for SectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//
// ─── SECTION / OUTLINE ─────────────────────────────────────────────────────────
//

/// One step of a lesson's navigable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub id: SectionId,
    pub order_index: usize,
}

impl Section {
    #[must_use]
    pub fn section_type(&self) -> SectionType {
        self.id.section_type()
    }
}

/// The fixed section sequence of a loaded lesson.
///
/// Built once from the concept list: overview, one section per concept in
/// list order, summary/application, general exercises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutline {
    lesson_id: LessonId,
    sections: Vec<Section>,
}

impl LessonOutline {
    #[must_use]
    pub fn new(lesson_id: LessonId, concepts: &[ConceptId]) -> Self {
        let ids = std::iter::once(SectionId::Overview)
            .chain(concepts.iter().copied().map(SectionId::Concept))
            .chain([SectionId::SummaryApplication, SectionId::GeneralExercises]);
        let sections = ids
            .enumerate()
            .map(|(order_index, id)| Section { id, order_index })
            .collect();
        Self {
            lesson_id,
            sections,
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// An outline always holds at least the three fixed sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn last_index(&self) -> usize {
        self.sections.len().saturating_sub(1)
    }

    #[must_use]
    pub fn is_last(&self, index: usize) -> bool {
        index == self.last_index()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn index_of(&self, id: SectionId) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = SectionId> + '_ {
        self.sections.iter().map(|s| s.id)
    }
}
