//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::model::{ScoreError, SectionId};
use storage::repository::StorageError;

/// Errors emitted by the remote lesson API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The backend answered with `success: false` or an error status.
    #[error("{message}")]
    Rejected {
        status: Option<u16>,
        message: String,
        validation: Vec<(String, Vec<String>)>,
    },
    #[error("response did not include {0}")]
    MissingPayload(&'static str),
    #[error("{0} is not supported by the lesson service")]
    Unsupported(&'static str),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// Human-readable message, falling back to `fallback` when the backend
    /// gave none.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            ApiError::Rejected { .. } | ApiError::MissingPayload(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => *status,
            ApiError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors emitted by `ScoreAggregator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("{message}")]
    ContentUnavailable { message: String },
    #[error("{message}")]
    CompletionData { message: String },
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `NavigationController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("no lesson is loaded")]
    NoLesson,
    #[error("section {index} is outside the lesson (len {len})")]
    OutOfRange { index: usize, len: usize },
    #[error("section {index} is not accessible yet")]
    NotAccessible { index: usize },
    #[error("section {0} is not part of the loaded lesson")]
    UnknownSection(SectionId),
    #[error("failed to load lesson: {0}")]
    Load(#[source] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BulkUploadService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BulkUploadError {
    #[error("Missing required files: {}", .0.join(", "))]
    MissingFiles(Vec<&'static str>),
    #[error("{}", .0.join("; "))]
    Invalid(Vec<String>),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}
