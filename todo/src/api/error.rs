//! Error types for the todo repository client

use thiserror::Error;

/// Errors that can occur when talking to the todo storage API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// HTTP request failed (connection, timeout, TLS)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// API answered with a non-2xx status
    #[error("API error (status {status}): {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Response parsed but violates the API contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::ResponseParseFailed(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}
