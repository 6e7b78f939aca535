use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use lesson_core::model::{LessonId, SectionId, SectionType};

use crate::api::LessonApi;

/// How a section type is confirmed complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStrategy {
    /// Ask the lesson service.
    Remote,
    /// Trust only the local progress store.
    Local,
}

impl VerifyStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VerifyStrategy::Remote => "remote",
            VerifyStrategy::Local => "local",
        }
    }
}

impl fmt::Display for VerifyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown verification strategy: {0}")]
pub struct ParseStrategyError(String);

impl FromStr for VerifyStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" => Ok(VerifyStrategy::Remote),
            "local" => Ok(VerifyStrategy::Local),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

/// Strategy per section type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPolicy {
    strategies: HashMap<SectionType, VerifyStrategy>,
}

impl Default for VerificationPolicy {
    /// Overview and summary/application are checked remotely; concepts and
    /// general exercises rely on local progress.
    fn default() -> Self {
        let strategies = SectionType::ALL
            .into_iter()
            .map(|ty| {
                let strategy = match ty {
                    SectionType::Overview | SectionType::SummaryApplication => {
                        VerifyStrategy::Remote
                    }
                    SectionType::Concept | SectionType::GeneralExercises => VerifyStrategy::Local,
                };
                (ty, strategy)
            })
            .collect();
        Self { strategies }
    }
}

impl VerificationPolicy {
    #[must_use]
    pub fn with(mut self, section_type: SectionType, strategy: VerifyStrategy) -> Self {
        self.strategies.insert(section_type, strategy);
        self
    }

    #[must_use]
    pub fn strategy_for(&self, section_type: SectionType) -> VerifyStrategy {
        self.strategies
            .get(&section_type)
            .copied()
            .unwrap_or(VerifyStrategy::Local)
    }
}

/// Confirms section completion with the lesson service.
#[derive(Clone)]
pub struct CompletionVerifier {
    api: Arc<dyn LessonApi>,
    policy: VerificationPolicy,
}

impl CompletionVerifier {
    #[must_use]
    pub fn new(api: Arc<dyn LessonApi>, policy: VerificationPolicy) -> Self {
        Self { api, policy }
    }

    #[must_use]
    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn is_remote(&self, section_type: SectionType) -> bool {
        self.policy.strategy_for(section_type) == VerifyStrategy::Remote
    }

    /// True only if the remote check says the section is complete. Local
    /// strategies, failures and unsupported checks all count as "not
    /// verified".
    pub async fn verify(&self, lesson_id: LessonId, section: SectionId) -> bool {
        if !self.is_remote(section.section_type()) {
            return false;
        }

        let result = match section {
            SectionId::Overview => self.api.check_lesson_overview(lesson_id).await,
            SectionId::SummaryApplication => {
                self.api
                    .check_lesson_summary_and_application(lesson_id)
                    .await
            }
            SectionId::Concept(concept_id) => self.api.check_concept(lesson_id, concept_id).await,
            SectionId::GeneralExercises => self.api.check_general_exercises(lesson_id).await,
        };

        match result {
            Ok(done) => {
                debug!(lesson_id = %lesson_id, section = %section, done, "remote completion check");
                done
            }
            Err(err) => {
                warn!(
                    lesson_id = %lesson_id,
                    section = %section,
                    error = %err,
                    "completion check failed"
                );
                false
            }
        }
    }
}
