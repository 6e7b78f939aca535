//! Lesson progression: navigation, completion checks and scoring.

mod guard;
mod navigation;
mod presenter;
mod reconciler;
mod scoring;
mod verifier;

pub use guard::{AttemptCounter, AttemptTicket, InFlight, InFlightGuard};
pub use navigation::{AdvanceOutcome, NavigationController};
pub use presenter::{LessonPresenter, Notice, NoticeLevel, RecordingPresenter, TracingPresenter};
pub use reconciler::{ReconcileReport, Reconciler};
pub use scoring::ScoreAggregator;
pub use verifier::{CompletionVerifier, ParseStrategyError, VerificationPolicy, VerifyStrategy};
