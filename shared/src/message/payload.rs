//! Push channel payloads
//!
//! Wire shapes of the four server → console messages. [`OrderEvent`] is the
//! typed view consoles pattern-match on.

use crate::order::Order;
use serde::{Deserialize, Serialize};

/// `connected`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub connection_id: String,
}

/// `initialOrders`: full snapshot, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialOrdersPayload {
    pub orders: Vec<Order>,
    pub count: usize,
}

/// Kind tag carried by `newOrder` / `updateOrderStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
}

/// `newOrder` / `updateOrderStatus`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderChangePayload {
    pub order: Order,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Server time of the mutation (Unix millis)
    pub timestamp: i64,
}

/// Server → console event
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    /// Transport established; always followed by [`OrderEvent::Initial`]
    Connected { connection_id: String },
    /// Full order set, newest first
    Initial(Vec<Order>),
    Created { order: Order, timestamp: i64 },
    Updated { order: Order, timestamp: i64 },
}

impl OrderEvent {
    pub fn created(order: Order) -> Self {
        let timestamp = order.updated_at;
        OrderEvent::Created { order, timestamp }
    }

    pub fn updated(order: Order) -> Self {
        let timestamp = order.updated_at;
        OrderEvent::Updated { order, timestamp }
    }

    /// Order carried by a delta event
    pub fn order(&self) -> Option<&Order> {
        match self {
            OrderEvent::Created { order, .. } | OrderEvent::Updated { order, .. } => Some(order),
            _ => None,
        }
    }
}
