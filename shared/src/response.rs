//! API Response types

use serde::{Deserialize, Serialize};

/// Command response envelope
///
/// ```json
/// { "success": true, "message": "Status updated", "data": { ... } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stable error code on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            code: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            code: None,
            data: Some(data),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            code: Some(code.into()),
            data: None,
        }
    }
}

/// Result of one cleanup (archive-then-delete) run
///
/// Success: `{success, archived, deleted, timestamp}`.
/// Failure: `{success: false, error, message, archived: 0, deleted: 0, timestamp}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub success: bool,
    pub archived: usize,
    pub deleted: usize,
    /// RFC 3339 time of the run
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CleanupReport {
    pub fn completed(archived: usize, deleted: usize, timestamp: impl Into<String>) -> Self {
        Self {
            success: true,
            archived,
            deleted,
            timestamp: timestamp.into(),
            error: None,
            message: None,
        }
    }

    pub fn failed(
        error: impl Into<String>,
        message: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            archived: 0,
            deleted: 0,
            timestamp: timestamp.into(),
            error: Some(error.into()),
            message: Some(message.into()),
        }
    }
}
