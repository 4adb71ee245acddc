//! Client error types

use shared::message::{FrameError, TransportError};
use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rejected by the hub with a stable error code
    #[error("[{code}] {message}")]
    Api { code: String, message: String },

    /// Permission denied
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Illegal transition or concurrent change
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Push channel could not be established
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Push channel closed by the hub
    #[error("Push channel closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => ClientError::Closed,
            TransportError::Io(e) => ClientError::Io(e),
            TransportError::Frame(e) => ClientError::Frame(e),
        }
    }
}

impl ClientError {
    /// Whether the push channel should be re-established after this error
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_) | ClientError::Closed | ClientError::Io(_) | ClientError::Frame(_)
        )
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
