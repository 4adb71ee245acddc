//! 统一错误处理
//!
//! [`AppError`] 是 HTTP 层的错误类型，响应体为 `ApiResponse`：
//!
//! ```json
//! { "success": false, "code": "E4001", "message": "Invalid transition from delivered to pending" }
//! ```
//!
//! # 状态码映射
//!
//! | 错误 | HTTP | 错误码 |
//! |------|------|--------|
//! | `OrderError::NotFound` | 404 | E0003 |
//! | `OrderError::Conflict` | 409 | E0004 |
//! | `OrderError::InvalidTransition` | 409 | E4001 |
//! | `OrderError::RoleNotPermitted` | 403 | E4002 |
//! | `OrderError::NotVisible` | 403 | E4003 |
//! | `OrderError::InvalidAssignment` | 422 | E4004 |
//! | `OrderError::InvalidOrder` | 400 | E4005 |
//! | `Invalid` | 400 | E0006 |
//! | `Unavailable` | 503 | E9003 |
//! | `Database` / `Internal` | 500 | E9002 / E9001 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use shared::OrderError;
use shared::response::ApiResponse;
use tracing::error;

use crate::orders::ManagerError;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Invalid request: {0}")]
    /// 无效请求 (400)
    Invalid(String),

    #[error("Service unavailable: {0}")]
    /// 服务不可用 (503)
    Unavailable(String),

    #[error("Database error: {0}")]
    /// 数据库错误 (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// 内部错误 (500)
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<ManagerError> for AppError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Order(e) => AppError::Order(e),
            ManagerError::Storage(e) => AppError::Database(e.to_string()),
            ManagerError::Broadcast(e) => AppError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Order(e) => {
                let status = match e {
                    OrderError::NotFound(_) => StatusCode::NOT_FOUND,
                    OrderError::Conflict(_) | OrderError::InvalidTransition { .. } => {
                        StatusCode::CONFLICT
                    }
                    OrderError::RoleNotPermitted { .. } | OrderError::NotVisible { .. } => {
                        StatusCode::FORBIDDEN
                    }
                    OrderError::InvalidAssignment(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    OrderError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
                };
                (status, e.code(), e.to_string())
            }
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, "E0006", msg.clone()),
            AppError::Unavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "E9003", msg.clone())
            }
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9002",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ApiResponse::<()>::error(code, message))).into_response()
    }
}

// ========== Helper functions ==========

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

/// Create a successful response with custom message
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok_with_message(data, message))
}
