//! Cleanup API Module
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/cleanup | POST | 手动触发归档清理 |

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/cleanup", post(handler::trigger))
}
