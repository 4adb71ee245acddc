//! HTTP command payloads (console → server)

use crate::order::{Customer, DriverRef, OrderStatus, OrderType, Supplement};
use serde::{Deserialize, Serialize};

/// Line item as submitted by checkout (totals are computed server-side)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supplements: Vec<Supplement>,
}

/// Checkout request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Client-chosen id; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub customer: Customer,
    pub items: Vec<OrderItemInput>,
    pub order_type: OrderType,
    pub payment_method: String,
}

/// `PUT /api/orders/{id}/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Driver assignment carried with a move into ready / out-for-delivery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverRef>,
}

impl StatusUpdateRequest {
    pub fn new(status: OrderStatus) -> Self {
        Self {
            status,
            reason: None,
            driver: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_driver(mut self, driver: DriverRef) -> Self {
        self.driver = Some(driver);
        self
    }
}

/// `PUT /api/orders/{id}/driver` (`driver: null` unassigns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignDriverRequest {
    pub driver: Option<DriverRef>,
}
