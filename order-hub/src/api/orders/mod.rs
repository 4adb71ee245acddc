//! Order API Module
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | GET | 订单列表 (新→旧，可按控制台过滤) |
//! | /api/orders | POST | 下单 |
//! | /api/orders/{id} | GET | 订单详情 |
//! | /api/orders/{id}/status | PUT | 状态变更 (需要 actor 头) |
//! | /api/orders/{id}/driver | PUT | 分配/取消司机 (admin) |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/driver", put(handler::assign_driver))
}
