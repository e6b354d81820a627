//! Error types for the backend client

use reqwest::StatusCode;
use thiserror::Error;

/// Everything a backend call can fail with. Callers turn these into a
/// notice for the user; none of them is fatal.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("server returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
