#![forbid(unsafe_code)]

pub mod api;
pub mod bulk_upload;
pub mod completion_view;
pub mod config;
pub mod error;
pub mod lessons;

pub use lesson_core::Clock;

pub use api::{CompletionBreakdown, HttpLessonApi, LessonApi, LessonUploadApi, UploadReceipt};
pub use bulk_upload::{BulkUploadFiles, BulkUploadService, CsvUpload};
pub use completion_view::CompletionView;
pub use config::{ApiConfig, verification_policy_from_env};
pub use error::{ApiError, BulkUploadError, ConfigError, NavigationError, ScoringError};
pub use lessons::{
    AdvanceOutcome, CompletionVerifier, LessonPresenter, NavigationController, Notice,
    Reconciler, ScoreAggregator, TracingPresenter, VerificationPolicy, VerifyStrategy,
};
