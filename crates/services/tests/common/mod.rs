#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use lesson_core::model::{Concept, ConceptId, ConceptScore, LearnerActivity, LessonContent, LessonId};
use services::api::{CompletionBreakdown, LessonApi};
use services::error::ApiError;

pub const LESSON: LessonId = LessonId::new(7);

pub fn lesson(concepts: &[u64]) -> LessonContent {
    LessonContent {
        id: LESSON,
        topic: "Fractions".into(),
        overview: "Parts of a whole".into(),
        summary: String::new(),
        application: String::new(),
        concepts: concepts
            .iter()
            .enumerate()
            .map(|(i, id)| Concept {
                id: ConceptId::new(*id),
                order_index: u32::try_from(i).unwrap(),
                title: format!("Concept {id}"),
                exercises: Vec::new(),
            })
            .collect(),
        general_exercises: Vec::new(),
    }
}

/// Concepts (80, 40) and (60, 30) plus general exercises (90, 30): 77.0.
pub fn sample_breakdown() -> CompletionBreakdown {
    let concept = |id: u64, title: &str, score: f64, weight: f64| ConceptScore {
        concept_id: ConceptId::new(id),
        title: title.into(),
        score,
        weight,
        completed_exercises: 2,
        total_exercises: 2,
    };
    CompletionBreakdown {
        lesson_title: "Fractions".into(),
        concept_scores: vec![
            concept(1, "Naming", 80.0, 40.0),
            concept(2, "Adding", 60.0, 30.0),
        ],
        general_exercises_score: 90.0,
        general_exercises_weight: 30.0,
        lesson_score: Some(77.0),
    }
}

/// Scriptable lesson service. Check endpoints can be held behind a gate to
/// interleave calls.
pub struct FakeApi {
    pub content: LessonContent,
    pub breakdown: CompletionBreakdown,
    pub overview_done: AtomicBool,
    pub summary_done: AtomicBool,
    pub overview_checks: AtomicUsize,
    pub summary_checks: AtomicUsize,
    pub content_fails: AtomicBool,
    pub completion_failures: AtomicUsize,
    pub completion_calls: AtomicUsize,
    pub gate: Option<Arc<Semaphore>>,
}

impl FakeApi {
    pub fn new(content: LessonContent) -> Self {
        Self {
            content,
            breakdown: sample_breakdown(),
            overview_done: AtomicBool::new(false),
            summary_done: AtomicBool::new(false),
            overview_checks: AtomicUsize::new(0),
            summary_checks: AtomicUsize::new(0),
            content_fails: AtomicBool::new(false),
            completion_failures: AtomicUsize::new(0),
            completion_calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn all_remote_done(self) -> Self {
        self.overview_done.store(true, Ordering::SeqCst);
        self.summary_done.store(true, Ordering::SeqCst);
        self
    }

    pub fn overview_checks(&self) -> usize {
        self.overview_checks.load(Ordering::SeqCst)
    }

    pub fn summary_checks(&self) -> usize {
        self.summary_checks.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

fn rejected(message: &str) -> ApiError {
    ApiError::Rejected {
        status: Some(500),
        message: message.into(),
        validation: Vec::new(),
    }
}

#[async_trait]
impl LessonApi for FakeApi {
    async fn check_lesson_overview(&self, _lesson_id: LessonId) -> Result<bool, ApiError> {
        self.overview_checks.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        Ok(self.overview_done.load(Ordering::SeqCst))
    }

    async fn check_lesson_summary_and_application(
        &self,
        _lesson_id: LessonId,
    ) -> Result<bool, ApiError> {
        self.summary_checks.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        Ok(self.summary_done.load(Ordering::SeqCst))
    }

    async fn get_lesson_content_by_id(
        &self,
        _lesson_id: LessonId,
    ) -> Result<LessonContent, ApiError> {
        if self.content_fails.load(Ordering::SeqCst) {
            return Err(rejected(""));
        }
        Ok(self.content.clone())
    }

    async fn get_lesson_completion_data(
        &self,
        _lesson_id: LessonId,
        _content: &LessonContent,
        _activity: &LearnerActivity,
    ) -> Result<CompletionBreakdown, ApiError> {
        self.completion_calls.fetch_add(1, Ordering::SeqCst);
        let pending_failures = self.completion_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.completion_failures
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(rejected("Completion service unavailable"));
        }
        Ok(self.breakdown.clone())
    }
}
