use crate::parser::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    StatusError(reqwest::StatusCode),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Subscription XML rejected: {0}")]
    ParseError(#[from] ParseError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("URL cannot be used as a base: {0}")]
    InvalidBaseUrl(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
