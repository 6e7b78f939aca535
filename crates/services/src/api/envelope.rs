use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::ApiError;

/// `{ success, message?, content?, data?, code?, errors? }` wrapper used by
/// every lesson-service response.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub message: Option<String>,
    pub content: Option<T>,
    pub data: Option<T>,
    pub code: Option<u16>,
    pub errors: Option<BTreeMap<String, Value>>,
}

/// Which request family a failure belongs to; picks fallback wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestContext {
    Lesson,
    Upload,
}

impl<T> ApiEnvelope<T> {
    /// Unwraps the payload (`data` first, then `content`) of a successful
    /// response.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Rejected` when `success` is false and
    /// `ApiError::MissingPayload` when neither field is present.
    pub fn into_payload(self, what: &'static str) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected {
                status: self.code,
                message: self.message.unwrap_or_default(),
                validation: flatten_errors(self.errors.as_ref()),
            });
        }
        self.data
            .or(self.content)
            .ok_or(ApiError::MissingPayload(what))
    }
}

/// Field → messages, accepting either a list or a single string per field.
pub(crate) fn flatten_errors(errors: Option<&BTreeMap<String, Value>>) -> Vec<(String, Vec<String>)> {
    let Some(errors) = errors else {
        return Vec::new();
    };
    errors
        .iter()
        .map(|(field, value)| {
            let messages = match value {
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
                Value::String(s) => vec![s.clone()],
                other => vec![other.to_string()],
            };
            (field.clone(), messages)
        })
        .collect()
}

/// Message shown for a non-success HTTP status.
#[must_use]
pub fn failure_message(
    status: StatusCode,
    message: Option<&str>,
    validation: &[(String, Vec<String>)],
    context: RequestContext,
) -> String {
    let message = message.map(str::trim).filter(|m| !m.is_empty());

    if status == StatusCode::UNPROCESSABLE_ENTITY && !validation.is_empty() {
        let details: Vec<String> = validation
            .iter()
            .map(|(field, errors)| format!("{field}: {}", errors.join(", ")))
            .collect();
        return format!("Validation failed - {}", details.join("; "));
    }
    if status == StatusCode::UNAUTHORIZED {
        return "Unauthorized - please log in again".to_string();
    }

    let fallback = match (status, context) {
        (StatusCode::BAD_REQUEST, RequestContext::Upload) => {
            "Invalid CSV format or missing columns"
        }
        (StatusCode::NOT_FOUND, RequestContext::Upload) => {
            "Resource not found (class, subject, term, week, lesson, or concept)"
        }
        (StatusCode::INTERNAL_SERVER_ERROR, RequestContext::Upload) => {
            "Server error processing CSV files"
        }
        (_, RequestContext::Upload) => "Bulk upload failed",
        (StatusCode::NOT_FOUND, RequestContext::Lesson) => "Lesson not found",
        (_, RequestContext::Lesson) => "An error occurred",
    };
    message.unwrap_or(fallback).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_prefers_data_then_content() {
        let env: ApiEnvelope<u32> =
            serde_json::from_value(json!({"success": true, "content": 4})).unwrap();
        assert_eq!(env.into_payload("n").unwrap(), 4);

        let env: ApiEnvelope<u32> =
            serde_json::from_value(json!({"success": true, "data": 1, "content": 2})).unwrap();
        assert_eq!(env.into_payload("n").unwrap(), 1);
    }

    #[test]
    fn unsuccessful_envelope_carries_message() {
        let env: ApiEnvelope<u32> = serde_json::from_value(
            json!({"success": false, "message": "Lesson locked", "code": 403}),
        )
        .unwrap();
        match env.into_payload("n").unwrap_err() {
            ApiError::Rejected {
                status, message, ..
            } => {
                assert_eq!(status, Some(403));
                assert_eq!(message, "Lesson locked");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_payload_is_reported() {
        let env: ApiEnvelope<u32> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(matches!(
            env.into_payload("lesson content"),
            Err(ApiError::MissingPayload("lesson content"))
        ));
    }

    #[test]
    fn validation_errors_are_joined_per_field() {
        let errors: BTreeMap<String, Value> = serde_json::from_value(json!({
            "lessons_file": ["must be csv", "too large"],
            "concepts_file": "missing"
        }))
        .unwrap();
        let flat = flatten_errors(Some(&errors));
        let msg = failure_message(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("ignored"),
            &flat,
            RequestContext::Upload,
        );
        assert_eq!(
            msg,
            "Validation failed - concepts_file: missing; lessons_file: must be csv, too large"
        );
    }

    #[test]
    fn status_fallbacks_depend_on_context() {
        assert_eq!(
            failure_message(StatusCode::BAD_REQUEST, None, &[], RequestContext::Upload),
            "Invalid CSV format or missing columns"
        );
        assert_eq!(
            failure_message(StatusCode::BAD_REQUEST, Some("Bad week"), &[], RequestContext::Upload),
            "Bad week"
        );
        assert_eq!(
            failure_message(StatusCode::UNAUTHORIZED, Some("expired"), &[], RequestContext::Lesson),
            "Unauthorized - please log in again"
        );
        assert_eq!(
            failure_message(StatusCode::NOT_FOUND, None, &[], RequestContext::Lesson),
            "Lesson not found"
        );
    }
}
