//! Pre-flight checks and submission of the all-in-one lesson upload.

use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use lesson_core::csv::{self, UploadKind};

use crate::api::{LessonUploadApi, UploadReceipt};
use crate::error::BulkUploadError;

pub const MAX_UPLOAD_SIZE_BYTES: usize = 10 * 1024 * 1024;

const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["text/csv", "text/plain", "application/csv"];
const ACCEPTED_EXTENSIONS: [&str; 2] = ["csv", "txt"];

/// One CSV file destined for a multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvUpload {
    pub kind: UploadKind,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl CsvUpload {
    #[must_use]
    pub fn new(kind: UploadKind, file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// # Errors
    ///
    /// Returns `BulkUploadError::Io` if the file cannot be read.
    pub fn from_path(kind: UploadKind, path: &Path) -> Result<Self, BulkUploadError> {
        let bytes = std::fs::read(path).map_err(|source| BulkUploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{kind}.csv"));
        Ok(Self::new(kind, file_name, bytes))
    }

    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Declared content type wins; without one the extension decides.
    #[must_use]
    pub fn is_csv_or_txt(&self) -> bool {
        if let Some(content_type) = &self.content_type {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if ACCEPTED_CONTENT_TYPES.contains(&essence.as_str()) {
                return true;
            }
        }
        self.file_name
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }
}

/// The files of one bulk upload, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkUploadFiles {
    files: Vec<CsvUpload>,
}

impl BulkUploadFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, replacing any previous file of the same kind.
    pub fn insert(&mut self, upload: CsvUpload) {
        self.files.retain(|f| f.kind != upload.kind);
        self.files.push(upload);
    }

    #[must_use]
    pub fn with(mut self, upload: CsvUpload) -> Self {
        self.insert(upload);
        self
    }

    /// Picks up `<kind>.csv` (or `.txt`, or the form field name) for each
    /// required kind found in `dir`. Missing kinds are left for
    /// [`BulkUploadFiles::preflight`] to report.
    ///
    /// # Errors
    ///
    /// Returns `BulkUploadError::Io` if a matching file cannot be read.
    pub fn from_dir(dir: &Path) -> Result<Self, BulkUploadError> {
        let mut files = Self::new();
        for kind in UploadKind::BULK {
            let stems = [
                kind.as_str().to_string(),
                kind.as_str().replace('-', "_"),
                kind.form_field().to_string(),
            ];
            let found = stems
                .iter()
                .flat_map(|stem| ACCEPTED_EXTENSIONS.map(|ext| dir.join(format!("{stem}.{ext}"))))
                .find(|path| path.is_file());
            if let Some(path) = found {
                debug!(kind = %kind, path = %path.display(), "found upload file");
                files.insert(CsvUpload::from_path(kind, &path)?);
            }
        }
        Ok(files)
    }

    #[must_use]
    pub fn get(&self, kind: UploadKind) -> Option<&CsvUpload> {
        self.files.iter().find(|f| f.kind == kind)
    }

    /// Files in form order.
    pub fn iter(&self) -> impl Iterator<Item = &CsvUpload> {
        UploadKind::BULK
            .into_iter()
            .chain(std::iter::once(UploadKind::SchemeOfWork))
            .filter_map(|kind| self.get(kind))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn missing(&self) -> Vec<UploadKind> {
        UploadKind::BULK
            .into_iter()
            .filter(|kind| self.get(*kind).is_none())
            .collect()
    }

    /// Checks presence, type, size and required columns of every file.
    ///
    /// # Errors
    ///
    /// Returns `BulkUploadError::MissingFiles` when required files are
    /// absent and `BulkUploadError::Invalid` with one message per problem
    /// otherwise.
    pub fn preflight(&self) -> Result<(), BulkUploadError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(BulkUploadError::MissingFiles(
                missing.into_iter().map(UploadKind::form_field).collect(),
            ));
        }

        let mut errors = Vec::new();
        for upload in self.iter() {
            let field = upload.kind.form_field();
            if !upload.is_csv_or_txt() {
                errors.push(format!("{field} must be a CSV or TXT file"));
                continue;
            }
            if upload.bytes.len() > MAX_UPLOAD_SIZE_BYTES {
                errors.push(format!("{field} must be less than 10MB"));
                continue;
            }
            let inspection = csv::validate(&upload.text(), upload.kind.required_columns(), None);
            errors.extend(inspection.errors.iter().map(|e| format!("{field}: {e}")));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BulkUploadError::Invalid(errors))
        }
    }

    /// Copy with every file rewritten into the numbered API layout.
    #[must_use]
    pub fn to_api_format(&self) -> Self {
        let files = self
            .files
            .iter()
            .map(|upload| CsvUpload {
                kind: upload.kind,
                file_name: csv::api_file_name(&upload.file_name),
                content_type: Some("text/csv".to_string()),
                bytes: csv::to_api_format(&upload.text()).into_bytes(),
            })
            .collect();
        Self { files }
    }
}

/// Validates and submits lesson files in one request.
#[derive(Clone)]
pub struct BulkUploadService {
    api: Arc<dyn LessonUploadApi>,
    api_format: bool,
}

impl BulkUploadService {
    #[must_use]
    pub fn new(api: Arc<dyn LessonUploadApi>) -> Self {
        Self {
            api,
            api_format: false,
        }
    }

    /// Convert files to the numbered API layout before sending.
    #[must_use]
    pub fn with_api_format(mut self, enabled: bool) -> Self {
        self.api_format = enabled;
        self
    }

    /// # Errors
    ///
    /// Returns the pre-flight error, or `BulkUploadError::Api` if the
    /// service rejects the upload.
    pub async fn upload(&self, files: &BulkUploadFiles) -> Result<UploadReceipt, BulkUploadError> {
        files.preflight()?;
        let converted;
        let payload = if self.api_format {
            converted = files.to_api_format();
            &converted
        } else {
            files
        };
        info!(files = payload.len(), api_format = self.api_format, "uploading lesson files");
        let receipt = self.api.upload_all_lesson_files(payload).await?;
        info!(message = %receipt.message, "lesson files uploaded");
        Ok(receipt)
    }
}
