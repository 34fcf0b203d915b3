//! Geographic import error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No header matched any of the candidate names.
    #[error("No column matching any of {candidates:?} in {headers:?}")]
    MissingColumn {
        candidates: Vec<String>,
        headers: Vec<String>,
    },

    #[error("Dataset {0} is empty")]
    EmptyDataset(String),
}
