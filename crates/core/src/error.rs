use thiserror::Error;

use crate::csv::CsvError;
use crate::model::{ScoreError, SectionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Section(#[from] SectionError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Csv(#[from] CsvError),
}
