use chrono::Duration;
use lesson_core::model::{ConceptId, ExerciseAttempt, ExerciseId, LessonId, SectionId};
use lesson_core::time::fixed_now;
use storage::repository::{ActivityRepository, SectionProgressStore};
use storage::sqlite::SqliteRepository;

async fn repo(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_progress_survives_reads_and_keeps_first_completion() {
    let repo = repo("memdb_progress").await;
    let lesson = LessonId::new(12);
    let concept = SectionId::Concept(ConceptId::new(4));

    repo.record_visit(lesson, SectionId::Overview).await.unwrap();
    repo.record_visit(lesson, SectionId::Overview).await.unwrap();
    repo.mark_completed(lesson, SectionId::Overview, fixed_now())
        .await
        .unwrap();
    repo.mark_completed(lesson, SectionId::Overview, fixed_now() + Duration::hours(2))
        .await
        .unwrap();
    repo.record_visit(lesson, concept).await.unwrap();

    let snapshot = repo.snapshot(lesson).await.unwrap();
    let overview = snapshot.get(SectionId::Overview).unwrap();
    assert!(overview.is_completed);
    assert_eq!(overview.attempts, 2);
    assert_eq!(overview.completed_at, Some(fixed_now()));
    assert!(!snapshot.is_completed(concept));
    assert_eq!(snapshot.get(concept).unwrap().attempts, 1);
}

#[tokio::test]
async fn sqlite_migrate_is_idempotent_and_clear_drops_lesson() {
    let repo = repo("memdb_clear").await;
    repo.migrate().await.expect("second migrate");

    repo.mark_completed(LessonId::new(1), SectionId::GeneralExercises, fixed_now())
        .await
        .unwrap();
    repo.mark_completed(LessonId::new(2), SectionId::GeneralExercises, fixed_now())
        .await
        .unwrap();
    repo.clear_lesson(LessonId::new(1)).await.unwrap();

    assert_eq!(repo.snapshot(LessonId::new(1)).await.unwrap().records().count(), 0);
    assert!(
        repo.snapshot(LessonId::new(2))
            .await
            .unwrap()
            .is_completed(SectionId::GeneralExercises)
    );
}

#[tokio::test]
async fn sqlite_activity_accumulates_time_and_attempts() {
    let repo = repo("memdb_activity").await;
    let lesson = LessonId::new(7);

    repo.add_section_time(lesson, SectionId::Overview, 30).await.unwrap();
    repo.add_section_time(lesson, SectionId::Overview, 45).await.unwrap();
    repo.add_section_time(lesson, SectionId::SummaryApplication, 10)
        .await
        .unwrap();

    for (offset, correct) in [(0, false), (15, true)] {
        repo.record_attempt(
            lesson,
            &ExerciseAttempt {
                exercise_id: ExerciseId::new(301),
                answer: format!("answer-{offset}"),
                is_correct: correct,
                at: fixed_now() + Duration::seconds(offset),
            },
        )
        .await
        .unwrap();
    }

    let activity = repo.activity(lesson).await.unwrap();
    assert_eq!(activity.section_time[&SectionId::Overview], 75);
    assert_eq!(activity.total_time_secs(), 85);

    let progress = &activity.exercise_progress[&ExerciseId::new(301)];
    assert_eq!(progress.attempts, 2);
    assert!(progress.is_completed);
    assert_eq!(progress.is_correct, Some(true));
    assert_eq!(progress.user_answer.as_deref(), Some("answer-15"));
    assert_eq!(progress.first_attempt_at, Some(fixed_now()));
}
