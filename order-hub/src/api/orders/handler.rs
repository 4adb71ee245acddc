//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::order::{ConsoleView, Order, filter_orders};
use shared::request::{AssignDriverRequest, CreateOrderRequest, StatusUpdateRequest};
use shared::response::ApiResponse;

use crate::api::actor::RequestActor;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult, ok, ok_with_message};

/// Query params for listing orders
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// admin | kitchen | driver
    pub view: Option<String>,
    pub driver_id: Option<String>,
}

impl ListQuery {
    fn console_view(&self) -> AppResult<Option<ConsoleView>> {
        let Some(view) = self.view.as_deref() else {
            return Ok(None);
        };
        match view {
            "admin" => Ok(Some(ConsoleView::Admin)),
            "kitchen" => Ok(Some(ConsoleView::Kitchen)),
            "driver" => match self.driver_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => Ok(Some(ConsoleView::Driver(id.to_string()))),
                _ => Err(AppError::invalid("view=driver requires driverId")),
            },
            other => Err(AppError::invalid(format!("Unknown view: {}", other))),
        }
    }
}

/// List orders, newest first
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let view = query.console_view()?;
    let orders = state.orders.list_orders()?;
    let orders = match view {
        Some(view) => filter_orders(&orders, &view).into_iter().cloned().collect(),
        None => orders,
    };
    Ok(ok(orders))
}

/// Get order by id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(ok(state.orders.get_order(&id)?))
}

/// Checkout
pub async fn create(
    State(state): State<ServerState>,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = state.orders.create_order(req)?;
    Ok((StatusCode::CREATED, ok(order)))
}

/// Status change
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    RequestActor(actor): RequestActor,
    Json(req): Json<StatusUpdateRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let status = req.status;
    let order = state.orders.apply_transition(&id, req, &actor)?;
    Ok(ok_with_message(order, format!("Order {} is now {}", id, status)))
}

/// Driver assignment (`driver: null` unassigns)
pub async fn assign_driver(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    RequestActor(actor): RequestActor,
    Json(req): Json<AssignDriverRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state.orders.assign_driver(&id, req.driver, &actor)?;
    Ok(ok(order))
}
