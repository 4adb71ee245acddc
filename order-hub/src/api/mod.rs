//! API 路由模块
//!
//! - [`orders`] - 订单查询与命令
//! - [`cleanup`] - 手动归档清理
//! - [`health`] - 健康检查
//! - [`actor`] - 请求方身份提取

pub mod actor;
pub mod cleanup;
pub mod health;
pub mod orders;

use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

/// HTTP 请求日志中间件
async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    tracing::info!(target: "http_access", "{} {} {}", method, uri, response.status());
    response
}

/// Build the Axum router bound to `state`
pub fn build_app(state: ServerState) -> Router {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(cleanup::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(log_request))
}
