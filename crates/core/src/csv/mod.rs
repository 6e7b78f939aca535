//! Inspection and normalization of lesson-content CSV files before upload.
//!
//! Authors hand in comma- or pipe-delimited files, sometimes with a UTF-8 BOM
//! and sometimes already in the API's numbered-row layout (`1|a,b,c`). The
//! helpers here sniff the layout, check required columns, and rewrite files
//! into the layout the upload endpoint expects.

mod inspect;
mod kind;
mod normalize;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use inspect::{inspect, parse_line, validate, validate_columns};
pub use kind::UploadKind;
pub use normalize::{api_file_name, normalize, normalized_file_name, to_api_format};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CsvError {
    #[error("unknown CSV format: {0}")]
    UnknownFormat(String),

    #[error("unknown upload kind: {0}")]
    UnknownKind(String),
}

/// Field delimiter detected in a CSV header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    Comma,
    Pipe,
    Unknown,
}

impl CsvFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CsvFormat::Comma => "comma",
            CsvFormat::Pipe => "pipe",
            CsvFormat::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CsvFormat {
    type Err = CsvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comma" => Ok(Self::Comma),
            "pipe" => Ok(Self::Pipe),
            other => Err(CsvError::UnknownFormat(other.to_string())),
        }
    }
}

/// Outcome of sniffing and validating a CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInspection {
    pub is_valid: bool,
    pub format: CsvFormat,
    pub headers: Vec<String>,
    pub missing_columns: Vec<String>,
    pub row_count: usize,
    pub errors: Vec<String>,
}

impl CsvInspection {
    pub(crate) fn rejected(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            format: CsvFormat::Unknown,
            headers: Vec::new(),
            missing_columns: Vec::new(),
            row_count: 0,
            errors: vec![error.into()],
        }
    }
}
