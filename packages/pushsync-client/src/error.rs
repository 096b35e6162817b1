use pushsync_sdk::{ParseError, SdkError, TransportErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Push transport error: {0}")]
    Transport(TransportErrorKind),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<SdkError> for ClientError {
    fn from(err: SdkError) -> Self {
        match err {
            SdkError::ParseError(e) => ClientError::Parse(e),
            other => ClientError::Network(other.to_string()),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
