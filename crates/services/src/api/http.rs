use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use lesson_core::model::{
    ConceptId, ExerciseId, ExerciseProgress, LearnerActivity, LessonContent, LessonId, SectionId,
};

use super::envelope::{ApiEnvelope, RequestContext, failure_message, flatten_errors};
use super::{CompletionBreakdown, LessonApi, LessonUploadApi, UploadReceipt};
use crate::bulk_upload::BulkUploadFiles;
use crate::config::ApiConfig;
use crate::error::ApiError;

/// `reqwest` client for the lesson service.
#[derive(Clone, Debug)]
pub struct HttpLessonApi {
    client: Client,
    config: ApiConfig,
}

impl HttpLessonApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the TLS backend cannot be initialised.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/json");
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_payload<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &'static str,
    ) -> Result<T, ApiError> {
        let url = self.config.url(path);
        debug!(%url, "GET");
        let response = self.authorize(self.client.get(url)).send().await?;
        read_envelope(response, what, RequestContext::Lesson).await
    }

    async fn check(&self, path: &str) -> Result<bool, ApiError> {
        let payload: CheckPayload = self.get_payload(path, "completion check").await?;
        Ok(payload.check.is_completed)
    }
}

/// Decodes an envelope, mapping error statuses to readable messages.
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
    what: &'static str,
    context: RequestContext,
) -> Result<T, ApiError> {
    if !response.status().is_success() {
        return Err(rejection(response, context).await);
    }
    let envelope: ApiEnvelope<T> = response.json().await?;
    envelope.into_payload(what)
}

async fn rejection(response: Response, context: RequestContext) -> ApiError {
    let status = response.status();
    // Error bodies are best-effort; a non-JSON body still yields a message.
    let envelope = response.json::<ApiEnvelope<serde_json::Value>>().await.ok();
    let (message, validation) = match &envelope {
        Some(env) => (env.message.as_deref(), flatten_errors(env.errors.as_ref())),
        None => (None, Vec::new()),
    };
    ApiError::Rejected {
        status: Some(status.as_u16()),
        message: failure_message(status, message, &validation, context),
        validation,
    }
}

#[derive(Debug, Deserialize)]
struct CheckPayload {
    check: CheckState,
}

#[derive(Debug, Deserialize)]
struct CheckState {
    #[serde(default)]
    is_completed: bool,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    lesson_id: LessonId,
    concept_ids: Vec<ConceptId>,
    general_exercise_ids: Vec<ExerciseId>,
    time_tracking: &'a BTreeMap<SectionId, u64>,
    total_time_secs: u64,
    exercise_progress: Vec<&'a ExerciseProgress>,
}

#[async_trait]
impl LessonApi for HttpLessonApi {
    async fn check_lesson_overview(&self, lesson_id: LessonId) -> Result<bool, ApiError> {
        self.check(&format!("lessons/{lesson_id}/overview/check"))
            .await
    }

    async fn check_lesson_summary_and_application(
        &self,
        lesson_id: LessonId,
    ) -> Result<bool, ApiError> {
        self.check(&format!("lessons/{lesson_id}/summary-application/check"))
            .await
    }

    async fn get_lesson_content_by_id(
        &self,
        lesson_id: LessonId,
    ) -> Result<LessonContent, ApiError> {
        self.get_payload(&format!("lessons/lesson/{lesson_id}/content"), "lesson content")
            .await
    }

    async fn get_lesson_completion_data(
        &self,
        lesson_id: LessonId,
        content: &LessonContent,
        activity: &LearnerActivity,
    ) -> Result<CompletionBreakdown, ApiError> {
        let body = CompletionRequest {
            lesson_id,
            concept_ids: content.concept_ids(),
            general_exercise_ids: content.general_exercise_ids(),
            time_tracking: &activity.section_time,
            total_time_secs: activity.total_time_secs(),
            exercise_progress: activity.exercise_progress.values().collect(),
        };
        let url = self.config.url(&format!("lessons/{lesson_id}/completion"));
        debug!(%url, "POST");
        let response = self
            .authorize(self.client.post(url))
            .json(&body)
            .send()
            .await?;
        read_envelope(response, "completion data", RequestContext::Lesson).await
    }
}

#[async_trait]
impl LessonUploadApi for HttpLessonApi {
    async fn upload_all_lesson_files(
        &self,
        files: &BulkUploadFiles,
    ) -> Result<UploadReceipt, ApiError> {
        let mut form = Form::new();
        for upload in files.iter() {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str("text/csv")?;
            form = form.part(upload.kind.bulk_field(), part);
        }

        let url = self
            .config
            .url("superadmin/lessons/uploads/all-lesson-files");
        debug!(%url, files = files.len(), "POST multipart");
        let response = self
            .authorize(self.client.post(url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response, RequestContext::Upload).await);
        }
        let envelope: ApiEnvelope<serde_json::Value> = response.json().await?;
        let message = envelope.message.clone();
        let content = envelope.into_payload("upload result").or_else(|err| match err {
            ApiError::MissingPayload(_) => Ok(serde_json::Value::Null),
            other => Err(other),
        })?;
        Ok(UploadReceipt {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "All lesson files uploaded successfully".to_string()),
            content,
        })
    }
}
