//! Error types for biomass analysis operations.

use thiserror::Error;

/// Errors that can occur while validating, computing, or persisting a
/// biomass analysis.
#[derive(Error, Debug)]
pub enum BiomassError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("No imagery available: {0}")]
    NoImagery(String),

    #[error("Imagery service error: {0}")]
    Imagery(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BiomassError {
    /// Map the error to an HTTP status code.
    pub fn http_status_code(&self) -> u16 {
        match self {
            BiomassError::InvalidRequest(_)
            | BiomassError::UnknownIndex(_)
            | BiomassError::InvalidGeometry(_)
            | BiomassError::InvalidDateRange(_) => 400,
            BiomassError::NoImagery(_) => 404,
            BiomassError::Imagery(_) => 502,
            BiomassError::Database(_) | BiomassError::Internal(_) => 500,
        }
    }
}

/// Result type alias for biomass operations.
pub type BiomassResult<T> = Result<T, BiomassError>;
