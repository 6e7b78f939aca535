mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::Semaphore;

use common::{FakeApi, LESSON, lesson};
use lesson_core::model::{ConceptId, SectionId, SectionType};
use lesson_core::time::{fixed_clock, fixed_now};
use services::completion_view::CompletionView;
use services::error::NavigationError;
use services::lessons::{
    AdvanceOutcome, NavigationController, Notice, RecordingPresenter, VerificationPolicy,
    VerifyStrategy,
};
use storage::repository::{SectionProgressStore, Storage};

struct Harness {
    api: Arc<FakeApi>,
    storage: Storage,
    presenter: Arc<RecordingPresenter>,
    nav: Arc<NavigationController>,
}

fn harness_with(api: FakeApi, policy: VerificationPolicy) -> Harness {
    let api = Arc::new(api);
    let storage = Storage::in_memory();
    let presenter = Arc::new(RecordingPresenter::new());
    let nav = Arc::new(NavigationController::new(
        api.clone(),
        &storage,
        policy,
        presenter.clone(),
        fixed_clock(),
    ));
    Harness {
        api,
        storage,
        presenter,
        nav,
    }
}

fn harness(api: FakeApi) -> Harness {
    harness_with(api, VerificationPolicy::default())
}

impl Harness {
    async fn complete(&self, section: SectionId) {
        self.storage
            .progress
            .mark_completed(LESSON, section, fixed_now())
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn walks_a_lesson_and_finishes_once() {
    let h = harness(FakeApi::new(lesson(&[1])).all_remote_done());
    let outline = h.nav.load_lesson(&h.api.content).await.unwrap();
    assert_eq!(outline.len(), 4);

    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 1 });

    let concept = SectionId::Concept(ConceptId::new(1));
    assert_eq!(
        h.nav.advance().await,
        AdvanceOutcome::CannotProceed { section: concept }
    );
    assert_eq!(h.nav.current_index(), Some(1));
    assert_eq!(
        h.presenter.notices(),
        [Notice::CannotProceed { section: concept }]
    );

    h.nav.mark_section_completed(concept).await.unwrap();
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 2 });
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 3 });

    h.nav
        .mark_section_completed(SectionId::GeneralExercises)
        .await
        .unwrap();
    let AdvanceOutcome::Finished(data) = h.nav.advance().await else {
        panic!("expected the lesson to finish");
    };
    assert!((data.lesson_score - 77.0).abs() < 1e-9);
    assert_eq!(CompletionView::new(&data).score_label(), "77%");
    assert!(h.nav.celebration_shown());
    assert_eq!(h.presenter.completions().len(), 1);

    assert_eq!(h.nav.advance().await, AdvanceOutcome::AlreadyFinished);
    assert_eq!(h.presenter.completions().len(), 1);
    assert_eq!(h.api.completion_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn finish_is_refused_while_any_section_is_incomplete() {
    let h = harness(FakeApi::new(lesson(&[])));
    h.nav.load_lesson(&h.api.content).await.unwrap();
    h.complete(SectionId::SummaryApplication).await;
    h.complete(SectionId::GeneralExercises).await;
    assert_eq!(h.nav.jump_to(2).await.unwrap(), 2);

    assert_eq!(
        h.nav.advance().await,
        AdvanceOutcome::Incomplete { remaining: 1 }
    );
    assert_eq!(
        h.presenter.notices(),
        [Notice::SectionsIncomplete { remaining: 1 }]
    );
    assert!(h.presenter.completions().is_empty());
    assert!(!h.nav.celebration_shown());
    assert_eq!(h.nav.current_index(), Some(2));
}

#[tokio::test]
async fn overlapping_advances_navigate_once() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        FakeApi::new(lesson(&[1]))
            .all_remote_done()
            .gated(gate.clone()),
    );
    h.nav.load_lesson(&h.api.content).await.unwrap();

    let first = h.nav.advance();
    let second = async {
        let outcome = h.nav.advance().await;
        gate.add_permits(1);
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, AdvanceOutcome::Moved { index: 1 });
    assert_eq!(second, AdvanceOutcome::Busy);
    assert_eq!(h.api.overview_checks(), 1);
    assert_eq!(h.nav.current_index(), Some(1));
    assert!(!h.nav.is_busy());
}

#[tokio::test]
async fn jumps_only_to_reachable_sections() {
    let h = harness(FakeApi::new(lesson(&[])).all_remote_done());
    h.nav.load_lesson(&h.api.content).await.unwrap();
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 1 });

    let err = h.nav.jump_to(2).await.unwrap_err();
    assert!(matches!(err, NavigationError::NotAccessible { index: 2 }));
    assert_eq!(
        h.presenter.notices(),
        [Notice::SectionNotAccessible { index: 2 }]
    );
    assert_eq!(h.nav.current_index(), Some(1));

    assert_eq!(h.nav.jump_to(1).await.unwrap(), 1);
    assert_eq!(h.nav.jump_to(0).await.unwrap(), 0);
    assert!(matches!(
        h.nav.jump_to(9).await,
        Err(NavigationError::OutOfRange { index: 9, len: 3 })
    ));
}

#[tokio::test]
async fn finish_repairs_stale_local_progress_with_one_check() {
    let api = FakeApi::new(lesson(&[]));
    api.overview_done.store(true, Ordering::SeqCst);
    let h = harness(api);
    h.nav.load_lesson(&h.api.content).await.unwrap();
    h.complete(SectionId::SummaryApplication).await;
    h.complete(SectionId::GeneralExercises).await;
    h.nav.jump_to(2).await.unwrap();

    let outcome = h.nav.advance().await;
    assert!(matches!(outcome, AdvanceOutcome::Finished(_)));
    assert_eq!(h.api.overview_checks(), 1);
    assert_eq!(h.api.summary_checks(), 0);

    let snapshot = h.storage.progress.snapshot(LESSON).await.unwrap();
    assert!(snapshot.is_completed(SectionId::Overview));
}

#[tokio::test]
async fn failed_completion_fetch_can_be_retried() {
    let api = FakeApi::new(lesson(&[])).all_remote_done();
    api.completion_failures.store(1, Ordering::SeqCst);
    let h = harness(api);
    h.nav.load_lesson(&h.api.content).await.unwrap();
    h.complete(SectionId::GeneralExercises).await;
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 1 });
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 2 });

    let AdvanceOutcome::CompletionFailed { message } = h.nav.advance().await else {
        panic!("expected the completion fetch to fail");
    };
    assert_eq!(message, "Completion service unavailable");
    assert!(!h.nav.celebration_shown());
    assert!(matches!(
        h.presenter.notices().last(),
        Some(Notice::CompletionFailed { .. })
    ));

    assert!(matches!(h.nav.advance().await, AdvanceOutcome::Finished(_)));
    assert!(h.nav.celebration_shown());
    assert_eq!(h.presenter.completions().len(), 1);
}

#[tokio::test]
async fn cancelled_attempt_leaves_state_untouched() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        FakeApi::new(lesson(&[]))
            .all_remote_done()
            .gated(gate.clone()),
    );
    h.nav.load_lesson(&h.api.content).await.unwrap();

    let pending = h.nav.advance();
    let navigate_away = async {
        tokio::task::yield_now().await;
        h.nav.cancel_pending();
        gate.add_permits(1);
    };
    let (outcome, ()) = tokio::join!(pending, navigate_away);

    assert_eq!(outcome, AdvanceOutcome::Cancelled);
    assert_eq!(h.nav.current_index(), Some(0));
    assert!(h.presenter.notices().is_empty());
    let snapshot = h.storage.progress.snapshot(LESSON).await.unwrap();
    assert!(!snapshot.is_completed(SectionId::Overview));

    gate.add_permits(1);
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 1 });
}

#[tokio::test]
async fn remote_concept_checks_without_endpoint_do_not_verify() {
    let policy = VerificationPolicy::default().with(SectionType::Concept, VerifyStrategy::Remote);
    let h = harness_with(FakeApi::new(lesson(&[4])).all_remote_done(), policy);
    h.nav.load_lesson(&h.api.content).await.unwrap();
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 1 });
    assert_eq!(
        h.nav.advance().await,
        AdvanceOutcome::CannotProceed {
            section: SectionId::Concept(ConceptId::new(4))
        }
    );
}

#[tokio::test]
async fn retreat_and_end_session() {
    let h = harness(FakeApi::new(lesson(&[])).all_remote_done());
    assert!(matches!(h.nav.retreat().await, Err(NavigationError::NoLesson)));
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Interrupted);

    h.nav.load_lesson(&h.api.content).await.unwrap();
    assert_eq!(h.nav.retreat().await.unwrap(), 0);
    assert_eq!(h.nav.advance().await, AdvanceOutcome::Moved { index: 1 });
    assert_eq!(h.nav.retreat().await.unwrap(), 0);

    h.nav.end_session().await.unwrap();
    assert_eq!(h.nav.current_index(), None);
    let snapshot = h.storage.progress.snapshot(LESSON).await.unwrap();
    assert_eq!(snapshot.records().count(), 0);
}

#[tokio::test]
async fn load_by_id_reports_content_failures() {
    let api = FakeApi::new(lesson(&[]));
    api.content_fails.store(true, Ordering::SeqCst);
    let h = harness(api);
    assert!(matches!(
        h.nav.load_lesson_by_id(LESSON).await,
        Err(NavigationError::Load(_))
    ));
    assert_eq!(h.nav.current_index(), None);
}
