//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/health | GET | 状态、订单数、已连接订阅者 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

/// 健康检查响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// 状态 (ok | stopping)
    status: &'static str,
    version: &'static str,
    orders: u64,
    connected_subscribers: usize,
    cleanup_running: bool,
    /// 运行时间 (秒)
    uptime_secs: u64,
}

async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthResponse>> {
    let status = if state.broadcaster().is_running() {
        "ok"
    } else {
        "stopping"
    };
    Ok(Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        orders: state.orders.order_count()?,
        connected_subscribers: state.broadcaster().connected_count(),
        cleanup_running: state.scheduler.pipeline().is_running(),
        uptime_secs: state.uptime_secs(),
    }))
}
