//! Error types for imagery-service interactions.

use thiserror::Error;

pub type EeResult<T> = Result<T, EeError>;

/// Failures surfaced by the imagery-analytics client.
#[derive(Debug, Error)]
pub enum EeError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Remote call failed: {0}")]
    Remote(String),

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("Invalid expression: {0}")]
    Expression(String),
}

impl From<reqwest::Error> for EeError {
    fn from(err: reqwest::Error) -> Self {
        EeError::Remote(err.to_string())
    }
}
