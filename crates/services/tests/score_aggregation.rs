mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{FakeApi, LESSON, lesson};
use lesson_core::model::ScoreError;
use services::error::ScoringError;
use services::lessons::ScoreAggregator;
use storage::repository::Storage;

fn aggregator(api: FakeApi) -> ScoreAggregator {
    let storage = Storage::in_memory();
    ScoreAggregator::new(Arc::new(api), storage.activity)
}

#[tokio::test]
async fn recomputes_weighted_score() {
    let mut api = FakeApi::new(lesson(&[1, 2]));
    api.breakdown.lesson_score = Some(12.0);
    let data = aggregator(api).aggregate(LESSON).await.unwrap();
    assert!((data.lesson_score - 77.0).abs() < 1e-9);
    assert_eq!(data.lesson_title, "Fractions");
    assert!(data.weights_balanced());
}

#[tokio::test]
async fn content_failure_uses_fallback_message() {
    let api = FakeApi::new(lesson(&[]));
    api.content_fails.store(true, Ordering::SeqCst);
    let err = aggregator(api).aggregate(LESSON).await.unwrap_err();
    assert!(matches!(err, ScoringError::ContentUnavailable { .. }));
    assert_eq!(err.to_string(), "Failed to load lesson content");
}

#[tokio::test]
async fn unbalanced_weights_still_score() {
    let mut api = FakeApi::new(lesson(&[1, 2]));
    api.breakdown.general_exercises_weight = 10.0;
    let data = aggregator(api).aggregate(LESSON).await.unwrap();
    assert!(!data.weights_balanced());
    assert!((data.lesson_score - 59.0).abs() < 1e-9);
}

#[tokio::test]
async fn out_of_range_scores_are_rejected() {
    let mut api = FakeApi::new(lesson(&[1, 2]));
    api.breakdown.concept_scores[0].score = 120.0;
    let err = aggregator(api).aggregate(LESSON).await.unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Score(ScoreError::OutOfRange { .. })
    ));
}

#[tokio::test]
async fn blank_title_falls_back_to_topic() {
    let mut api = FakeApi::new(lesson(&[1, 2]));
    api.breakdown.lesson_title = "  ".into();
    api.content.topic = "Equivalent fractions".into();
    let data = aggregator(api).aggregate(LESSON).await.unwrap();
    assert_eq!(data.lesson_title, "Equivalent fractions");
}
