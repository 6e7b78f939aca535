use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use lesson_core::Clock;
use lesson_core::model::{
    ExerciseAttempt, LessonCompletionData, LessonContent, LessonId, LessonOutline, Section,
    SectionId,
};
use storage::repository::{ActivityRepository, SectionProgressStore, Storage};

use super::guard::{AttemptCounter, AttemptTicket, InFlight};
use super::presenter::{LessonPresenter, Notice};
use super::reconciler::Reconciler;
use super::scoring::ScoreAggregator;
use super::verifier::{CompletionVerifier, VerificationPolicy};
use crate::api::LessonApi;
use crate::error::NavigationError;

/// Result of a single `advance()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Another advance was already running; this one was dropped.
    Busy,
    Moved { index: usize },
    CannotProceed { section: SectionId },
    Incomplete { remaining: usize },
    Finished(Box<LessonCompletionData>),
    /// The completion summary was already shown for this lesson.
    AlreadyFinished,
    CompletionFailed { message: String },
    /// The attempt was superseded by navigation or a lesson reload.
    Cancelled,
    /// An unexpected failure; the cursor did not move.
    Interrupted,
}

#[derive(Debug)]
struct LessonState {
    outline: LessonOutline,
    current: usize,
    celebration_shown: bool,
    entered_at: DateTime<Utc>,
}

/// Drives a learner through a lesson's sections.
///
/// Controller state sits behind a `std::sync::Mutex` that is only ever locked
/// from synchronous helpers, so no lock is held across an `.await`.
pub struct NavigationController {
    api: Arc<dyn LessonApi>,
    store: Arc<dyn SectionProgressStore>,
    activity: Arc<dyn ActivityRepository>,
    verifier: CompletionVerifier,
    reconciler: Reconciler,
    aggregator: ScoreAggregator,
    presenter: Arc<dyn LessonPresenter>,
    clock: Clock,
    in_flight: InFlight,
    attempts: AttemptCounter,
    state: Mutex<Option<LessonState>>,
}

impl NavigationController {
    #[must_use]
    pub fn new(
        api: Arc<dyn LessonApi>,
        storage: &Storage,
        policy: VerificationPolicy,
        presenter: Arc<dyn LessonPresenter>,
        clock: Clock,
    ) -> Self {
        let verifier = CompletionVerifier::new(Arc::clone(&api), policy);
        let reconciler = Reconciler::new(Arc::clone(&storage.progress), verifier.clone(), clock);
        let aggregator = ScoreAggregator::new(Arc::clone(&api), Arc::clone(&storage.activity));
        Self {
            api,
            store: Arc::clone(&storage.progress),
            activity: Arc::clone(&storage.activity),
            verifier,
            reconciler,
            aggregator,
            presenter,
            clock,
            in_flight: InFlight::new(),
            attempts: AttemptCounter::new(),
            state: Mutex::new(None),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut Option<LessonState>) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Fetches a lesson by id and loads it.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Load` if the content request fails and
    /// `NavigationError::Storage` if the first visit cannot be recorded.
    pub async fn load_lesson_by_id(
        &self,
        lesson_id: LessonId,
    ) -> Result<LessonContent, NavigationError> {
        let content = self
            .api
            .get_lesson_content_by_id(lesson_id)
            .await
            .map_err(NavigationError::Load)?;
        self.load_lesson(&content).await?;
        Ok(content)
    }

    /// Starts the lesson at its overview. Pending attempts for any previous
    /// lesson are cancelled.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Storage` if the visit cannot be recorded.
    pub async fn load_lesson(
        &self,
        content: &LessonContent,
    ) -> Result<LessonOutline, NavigationError> {
        self.attempts.cancel();
        let outline = content.outline();
        let now = self.clock.now();
        let previous = self.with_state(|state| {
            state
                .replace(LessonState {
                    outline: outline.clone(),
                    current: 0,
                    celebration_shown: false,
                    entered_at: now,
                })
                .and_then(|prev| Self::current_section_of(&prev).map(|s| (prev, s)))
        });
        if let Some((prev, section)) = previous {
            self.flush_time(prev.outline.lesson_id(), section, prev.entered_at)
                .await;
        }

        let first = outline.get(0).map(|s| s.id).unwrap_or(SectionId::Overview);
        self.store.record_visit(outline.lesson_id(), first).await?;
        info!(lesson_id = %outline.lesson_id(), sections = outline.len(), "lesson loaded");
        Ok(outline)
    }

    /// Moves forward, or runs the finish sequence on the last section.
    pub async fn advance(&self) -> AdvanceOutcome {
        let Some(_guard) = self.in_flight.try_acquire() else {
            debug!("advance already in flight");
            return AdvanceOutcome::Busy;
        };
        let ticket = self.attempts.issue();
        match self.advance_inner(&ticket).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "navigation interrupted");
                AdvanceOutcome::Interrupted
            }
        }
    }

    async fn advance_inner(&self, ticket: &AttemptTicket) -> Result<AdvanceOutcome, NavigationError> {
        let (outline, current) = self
            .with_state(|state| state.as_ref().map(|s| (s.outline.clone(), s.current)))
            .ok_or(NavigationError::NoLesson)?;
        let lesson_id = outline.lesson_id();
        let section = outline
            .get(current)
            .map(|s| s.id)
            .ok_or(NavigationError::OutOfRange {
                index: current,
                len: outline.len(),
            })?;

        let snapshot = self.store.snapshot(lesson_id).await?;
        if !snapshot.is_completed(section) {
            let verified = self.verifier.verify(lesson_id, section).await;
            if !ticket.is_current() {
                return Ok(AdvanceOutcome::Cancelled);
            }
            if !verified {
                self.presenter.notify(Notice::CannotProceed { section });
                return Ok(AdvanceOutcome::CannotProceed { section });
            }
            self.store
                .mark_completed(lesson_id, section, self.clock.now())
                .await?;
        }
        if !ticket.is_current() {
            return Ok(AdvanceOutcome::Cancelled);
        }

        if outline.is_last(current) {
            return self.finish(&outline, ticket).await;
        }

        let next = current + 1;
        let now = self.clock.now();
        let entered = self.with_state(|state| match state {
            Some(s)
                if s.outline.lesson_id() == lesson_id
                    && s.current == current
                    && ticket.is_current() =>
            {
                let entered = s.entered_at;
                s.current = next;
                s.entered_at = now;
                Some(entered)
            }
            _ => None,
        });
        let Some(entered) = entered else {
            return Ok(AdvanceOutcome::Cancelled);
        };

        self.flush_time(lesson_id, section, entered).await;
        if let Some(next_section) = outline.get(next) {
            self.store.record_visit(lesson_id, next_section.id).await?;
        }
        debug!(lesson_id = %lesson_id, index = next, "moved to next section");
        Ok(AdvanceOutcome::Moved { index: next })
    }

    async fn finish(
        &self,
        outline: &LessonOutline,
        ticket: &AttemptTicket,
    ) -> Result<AdvanceOutcome, NavigationError> {
        let lesson_id = outline.lesson_id();
        let remaining = match self.reconciler.reconcile(outline).await {
            Ok(report) => report.still_incomplete.len(),
            Err(err) => {
                warn!(lesson_id = %lesson_id, error = %err, "reconciliation failed");
                self.store
                    .snapshot(lesson_id)
                    .await?
                    .incomplete(outline)
                    .len()
            }
        };
        if !ticket.is_current() {
            return Ok(AdvanceOutcome::Cancelled);
        }
        if remaining > 0 {
            self.presenter
                .notify(Notice::SectionsIncomplete { remaining });
            return Ok(AdvanceOutcome::Incomplete { remaining });
        }

        let claimed = self.with_state(|state| match state {
            Some(s) if s.outline.lesson_id() == lesson_id && ticket.is_current() => {
                Some(!std::mem::replace(&mut s.celebration_shown, true))
            }
            _ => None,
        });
        match claimed {
            None => return Ok(AdvanceOutcome::Cancelled),
            Some(false) => return Ok(AdvanceOutcome::AlreadyFinished),
            Some(true) => {}
        }

        let outcome = self.celebrate(outline, ticket).await;
        if !matches!(outcome, Ok(AdvanceOutcome::Finished(_))) {
            self.release_celebration(lesson_id);
        }
        outcome
    }

    /// Runs with the celebration flag claimed; the caller releases it unless
    /// this returns `Finished`.
    async fn celebrate(
        &self,
        outline: &LessonOutline,
        ticket: &AttemptTicket,
    ) -> Result<AdvanceOutcome, NavigationError> {
        let lesson_id = outline.lesson_id();
        let data = match self.aggregator.aggregate(lesson_id).await {
            Ok(data) => data,
            Err(err) => {
                if !ticket.is_current() {
                    return Ok(AdvanceOutcome::Cancelled);
                }
                let message = err.to_string();
                error!(lesson_id = %lesson_id, error = %message, "failed to load completion data");
                self.presenter.notify(Notice::CompletionFailed {
                    message: message.clone(),
                });
                return Ok(AdvanceOutcome::CompletionFailed { message });
            }
        };
        if !ticket.is_current() {
            return Ok(AdvanceOutcome::Cancelled);
        }

        // Progress may have been cleared while the score was loading.
        let snapshot = self.store.snapshot(lesson_id).await?;
        let remaining = snapshot.incomplete(outline).len();
        if remaining > 0 {
            self.presenter
                .notify(Notice::SectionsIncomplete { remaining });
            return Ok(AdvanceOutcome::Incomplete { remaining });
        }

        let now = self.clock.now();
        let last = self.with_state(|state| match state {
            Some(s) if s.outline.lesson_id() == lesson_id => {
                let entered = std::mem::replace(&mut s.entered_at, now);
                Self::current_section_of(s).map(|section| (section, entered))
            }
            _ => None,
        });
        if let Some((section, entered)) = last {
            self.flush_time(lesson_id, section, entered).await;
        }

        info!(
            lesson_id = %lesson_id,
            score = data.lesson_score,
            "lesson finished"
        );
        self.presenter.show_completion(lesson_id, &data);
        Ok(AdvanceOutcome::Finished(Box::new(data)))
    }

    fn release_celebration(&self, lesson_id: LessonId) {
        self.with_state(|state| {
            if let Some(s) = state.as_mut().filter(|s| s.outline.lesson_id() == lesson_id) {
                s.celebration_shown = false;
            }
        });
    }

    /// Moves back one section without verification. Cancels any pending
    /// advance.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::NoLesson` if nothing is loaded.
    pub async fn retreat(&self) -> Result<usize, NavigationError> {
        self.attempts.cancel();
        let now = self.clock.now();
        let moved = self
            .with_state(|state| {
                state.as_mut().map(|s| {
                    if s.current == 0 {
                        return None;
                    }
                    let left = s.outline.get(s.current).map(|sec| sec.id);
                    let entered = std::mem::replace(&mut s.entered_at, now);
                    s.current -= 1;
                    Some((s.outline.lesson_id(), s.current, left, entered))
                })
            })
            .ok_or(NavigationError::NoLesson)?;

        match moved {
            None => Ok(0),
            Some((lesson_id, index, left, entered)) => {
                if let Some(section) = left {
                    self.flush_time(lesson_id, section, entered).await;
                }
                Ok(index)
            }
        }
    }

    /// Jumps to `index` if it is the overview, the current section, or a
    /// section already completed in the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::NotAccessible` (after notifying the
    /// presenter) for locked sections, `NavigationError::OutOfRange` for
    /// indices past the end and `NavigationError::NoLesson` if nothing is
    /// loaded.
    pub async fn jump_to(&self, index: usize) -> Result<usize, NavigationError> {
        let (outline, current) = self
            .with_state(|state| state.as_ref().map(|s| (s.outline.clone(), s.current)))
            .ok_or(NavigationError::NoLesson)?;
        let target = outline
            .get(index)
            .map(|s| s.id)
            .ok_or(NavigationError::OutOfRange {
                index,
                len: outline.len(),
            })?;
        if index == current {
            return Ok(index);
        }

        let lesson_id = outline.lesson_id();
        if index != 0 {
            let snapshot = self.store.snapshot(lesson_id).await?;
            if !snapshot.is_completed(target) {
                self.presenter
                    .notify(Notice::SectionNotAccessible { index });
                return Err(NavigationError::NotAccessible { index });
            }
        }

        self.attempts.cancel();
        let now = self.clock.now();
        let left = self.with_state(|state| match state {
            Some(s) if s.outline.lesson_id() == lesson_id => {
                let left = Self::current_section_of(s);
                let entered = std::mem::replace(&mut s.entered_at, now);
                s.current = index;
                left.map(|section| (section, entered))
            }
            _ => None,
        });
        if let Some((section, entered)) = left {
            self.flush_time(lesson_id, section, entered).await;
        }
        self.store.record_visit(lesson_id, target).await?;
        Ok(index)
    }

    /// Invalidates any advance still waiting on the network.
    pub fn cancel_pending(&self) {
        self.attempts.cancel();
    }

    /// Records local completion, e.g. after the last concept exercise.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::UnknownSection` if the section is not in the
    /// loaded lesson.
    pub async fn mark_section_completed(&self, section: SectionId) -> Result<(), NavigationError> {
        let lesson_id = self.lesson_containing(section)?;
        self.store
            .mark_completed(lesson_id, section, self.clock.now())
            .await?;
        debug!(lesson_id = %lesson_id, section = %section, "section marked complete");
        Ok(())
    }

    /// Stores an exercise answer for the loaded lesson's score inputs.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::NoLesson` if nothing is loaded.
    pub async fn record_exercise_attempt(
        &self,
        attempt: &ExerciseAttempt,
    ) -> Result<(), NavigationError> {
        let lesson_id = self
            .lesson_id()
            .ok_or(NavigationError::NoLesson)?;
        self.activity.record_attempt(lesson_id, attempt).await?;
        Ok(())
    }

    /// Drops the lesson and its stored section progress.
    ///
    /// # Errors
    ///
    /// Returns `NavigationError::Storage` if progress cannot be cleared.
    pub async fn end_session(&self) -> Result<(), NavigationError> {
        self.attempts.cancel();
        let Some(state) = self.with_state(Option::take) else {
            return Ok(());
        };
        let lesson_id = state.outline.lesson_id();
        if let Some(section) = Self::current_section_of(&state) {
            self.flush_time(lesson_id, section, state.entered_at).await;
        }
        self.store.clear_lesson(lesson_id).await?;
        info!(lesson_id = %lesson_id, "lesson session ended");
        Ok(())
    }

    fn lesson_containing(&self, section: SectionId) -> Result<LessonId, NavigationError> {
        self.with_state(|state| {
            let s = state.as_ref().ok_or(NavigationError::NoLesson)?;
            s.outline
                .index_of(section)
                .map(|_| s.outline.lesson_id())
                .ok_or(NavigationError::UnknownSection(section))
        })
    }

    fn current_section_of(state: &LessonState) -> Option<SectionId> {
        state.outline.get(state.current).map(|s| s.id)
    }

    async fn flush_time(&self, lesson_id: LessonId, section: SectionId, entered: DateTime<Utc>) {
        let secs = self.clock.seconds_since(entered);
        if secs == 0 {
            return;
        }
        if let Err(err) = self
            .activity
            .add_section_time(lesson_id, section, secs)
            .await
        {
            warn!(lesson_id = %lesson_id, section = %section, error = %err, "failed to record time");
        }
    }

    #[must_use]
    pub fn lesson_id(&self) -> Option<LessonId> {
        self.with_state(|state| state.as_ref().map(|s| s.outline.lesson_id()))
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        self.with_state(|state| state.as_ref().map(|s| s.current))
    }

    #[must_use]
    pub fn current_section(&self) -> Option<Section> {
        self.with_state(|state| {
            state
                .as_ref()
                .and_then(|s| s.outline.get(s.current).copied())
        })
    }

    #[must_use]
    pub fn outline(&self) -> Option<LessonOutline> {
        self.with_state(|state| state.as_ref().map(|s| s.outline.clone()))
    }

    #[must_use]
    pub fn celebration_shown(&self) -> bool {
        self.with_state(|state| state.as_ref().is_some_and(|s| s.celebration_shown))
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_held()
    }
}
