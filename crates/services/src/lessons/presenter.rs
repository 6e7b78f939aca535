use std::sync::Mutex;

use tracing::{info, warn};

use lesson_core::model::{LessonCompletionData, LessonId, SectionId, display_percent};

/// Transient user-facing message raised by navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CannotProceed { section: SectionId },
    SectionNotAccessible { index: usize },
    SectionsIncomplete { remaining: usize },
    CompletionFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

impl Notice {
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Notice::CannotProceed { .. } => "Cannot proceed",
            Notice::SectionNotAccessible { .. } => "Section not accessible",
            Notice::SectionsIncomplete { .. } => "Lesson incomplete",
            Notice::CompletionFailed { .. } => "Failed to load completion summary",
        }
    }

    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Notice::CannotProceed { .. } => "Please complete the current section first.".into(),
            Notice::SectionNotAccessible { .. } => "Complete previous sections first.".into(),
            Notice::SectionsIncomplete { remaining: 1 } => {
                "1 section incomplete. Please complete all sections before finishing.".into()
            }
            Notice::SectionsIncomplete { remaining } => format!(
                "{remaining} sections incomplete. Please complete all sections before finishing."
            ),
            Notice::CompletionFailed { message } if !message.is_empty() => {
                format!("{message}. Please try finishing the lesson again.")
            }
            Notice::CompletionFailed { .. } => "Please try finishing the lesson again.".into(),
        }
    }

    #[must_use]
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::CompletionFailed { .. } => NoticeLevel::Error,
            _ => NoticeLevel::Warning,
        }
    }
}

/// Where navigation sends notices and the one-time completion summary.
pub trait LessonPresenter: Send + Sync {
    fn notify(&self, notice: Notice);
    fn show_completion(&self, lesson_id: LessonId, data: &LessonCompletionData);
}

/// Renders everything as log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl LessonPresenter for TracingPresenter {
    fn notify(&self, notice: Notice) {
        match notice.level() {
            NoticeLevel::Warning => warn!(title = notice.title(), "{}", notice.description()),
            NoticeLevel::Error => {
                tracing::error!(title = notice.title(), "{}", notice.description());
            }
        }
    }

    fn show_completion(&self, lesson_id: LessonId, data: &LessonCompletionData) {
        info!(
            lesson_id = %lesson_id,
            title = %data.lesson_title,
            score = display_percent(data.lesson_score),
            "lesson completed"
        );
    }
}

/// Keeps every call, for assertions.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    notices: Mutex<Vec<Notice>>,
    completions: Mutex<Vec<(LessonId, LessonCompletionData)>>,
}

impl RecordingPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn completions(&self) -> Vec<(LessonId, LessonCompletionData)> {
        self.completions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl LessonPresenter for RecordingPresenter {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notice);
    }

    fn show_completion(&self, lesson_id: LessonId, data: &LessonCompletionData) {
        self.completions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((lesson_id, data.clone()));
    }
}
