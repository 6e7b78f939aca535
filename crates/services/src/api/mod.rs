//! Boundary to the remote lesson service.

mod envelope;
mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use lesson_core::model::{ConceptId, ConceptScore, LearnerActivity, LessonContent, LessonId};

use crate::bulk_upload::BulkUploadFiles;
use crate::error::ApiError;

pub use envelope::{ApiEnvelope, RequestContext, failure_message};
pub use http::HttpLessonApi;

/// Per-concept and general-exercise results as reported by the backend.
///
/// The lesson total is recomputed locally from these parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionBreakdown {
    pub lesson_title: String,
    #[serde(default)]
    pub concept_scores: Vec<ConceptScore>,
    #[serde(default)]
    pub general_exercises_score: f64,
    #[serde(default)]
    pub general_exercises_weight: f64,
    #[serde(default)]
    pub lesson_score: Option<f64>,
}

/// Successful bulk upload acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub message: String,
    pub content: serde_json::Value,
}

/// Remote lesson endpoints used by navigation and scoring.
#[async_trait]
pub trait LessonApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    async fn check_lesson_overview(&self, lesson_id: LessonId) -> Result<bool, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    async fn check_lesson_summary_and_application(
        &self,
        lesson_id: LessonId,
    ) -> Result<bool, ApiError>;

    /// Concept completion check. Backends without the endpoint keep the
    /// default.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unsupported` unless overridden.
    async fn check_concept(
        &self,
        _lesson_id: LessonId,
        _concept_id: ConceptId,
    ) -> Result<bool, ApiError> {
        Err(ApiError::Unsupported("concept completion check"))
    }

    /// # Errors
    ///
    /// Returns `ApiError::Unsupported` unless overridden.
    async fn check_general_exercises(&self, _lesson_id: LessonId) -> Result<bool, ApiError> {
        Err(ApiError::Unsupported("general exercises completion check"))
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    async fn get_lesson_content_by_id(&self, lesson_id: LessonId)
    -> Result<LessonContent, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    async fn get_lesson_completion_data(
        &self,
        lesson_id: LessonId,
        content: &LessonContent,
        activity: &LearnerActivity,
    ) -> Result<CompletionBreakdown, ApiError>;
}

/// Content-authoring upload endpoint.
#[async_trait]
pub trait LessonUploadApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the backend rejects it.
    async fn upload_all_lesson_files(
        &self,
        files: &BulkUploadFiles,
    ) -> Result<UploadReceipt, ApiError>;
}
