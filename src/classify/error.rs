//! Error types for column classification.

use thiserror::Error;

/// Ways a single classification request can fail. None are retried.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Column name missing or blank
    #[error("Invalid classification input: {0}")]
    InvalidInput(String),

    /// No API key configured for the hosted model
    #[error("Classification model is not configured: {0}")]
    NotConfigured(String),

    /// Network or transport failure reaching the model endpoint
    #[error("Failed to reach classification model: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("Classification model returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// A success status whose body is not a chat-completions document
    #[error("Classification model returned an unexpected response body: {0}")]
    Protocol(String),

    /// The endpoint answered but the completion text was empty
    #[error("Classification model returned an empty response")]
    EmptyResponse,

    /// The completion did not contain parseable JSON
    #[error("Failed to parse classification JSON: {0}")]
    Parse(String),

    /// The JSON parsed but does not match the classification shape
    #[error("Classification JSON failed validation: {0}")]
    Validation(String),
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        ClassifyError::Transport(err.to_string())
    }
}

/// Result type for classification operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;
