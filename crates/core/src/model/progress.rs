use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::section::{LessonOutline, Section, SectionId, SectionType};

/// Completion record for one section of a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub section_id: SectionId,
    pub section_type: SectionType,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub exercises_completed: u32,
    pub exercises_total: u32,
    pub attempts: u32,
}

impl SectionProgress {
    /// Fresh, not-yet-completed record for a section.
    #[must_use]
    pub fn visited(section_id: SectionId) -> Self {
        Self {
            section_id,
            section_type: section_id.section_type(),
            is_completed: false,
            completed_at: None,
            exercises_completed: 0,
            exercises_total: 0,
            attempts: 0,
        }
    }

    /// Marks the record completed. The first completion time is kept.
    pub fn complete(&mut self, at: DateTime<Utc>) {
        if !self.is_completed {
            self.is_completed = true;
            self.completed_at = Some(at);
        }
    }
}

/// Point-in-time copy of a lesson's section progress.
///
/// Completeness decisions must be made against a snapshot read right before
/// the decision, never one captured earlier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    sections: HashMap<SectionId, SectionProgress>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = SectionProgress>) -> Self {
        Self {
            sections: records.into_iter().map(|p| (p.section_id, p)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: SectionId) -> Option<&SectionProgress> {
        self.sections.get(&id)
    }

    /// Missing records count as incomplete.
    #[must_use]
    pub fn is_completed(&self, id: SectionId) -> bool {
        self.sections.get(&id).is_some_and(|p| p.is_completed)
    }

    /// Sections of the outline not yet completed, in lesson order.
    #[must_use]
    pub fn incomplete<'a>(&self, outline: &'a LessonOutline) -> Vec<&'a Section> {
        outline
            .sections()
            .iter()
            .filter(|s| !self.is_completed(s.id))
            .collect()
    }

    #[must_use]
    pub fn all_completed(&self, outline: &LessonOutline) -> bool {
        outline.ids().all(|id| self.is_completed(id))
    }

    #[must_use]
    pub fn completed_count(&self, outline: &LessonOutline) -> usize {
        outline.ids().filter(|id| self.is_completed(*id)).count()
    }

    /// Whole-number completion percentage over the outline's sections.
    #[must_use]
    pub fn percent_complete(&self, outline: &LessonOutline) -> u8 {
        if outline.is_empty() {
            return 0;
        }
        let done = self.completed_count(outline) * 100;
        let pct = (done + outline.len() / 2) / outline.len();
        u8::try_from(pct).unwrap_or(100)
    }

    pub fn records(&self) -> impl Iterator<Item = &SectionProgress> {
        self.sections.values()
    }
}
