//! Order status state machine
//!
//! ```text
//! pending ──▶ confirmed ──▶ preparing ──▶ ready ──▶ out-for-delivery ──▶ delivered
//!    │            │                        │          (delivery)            ▲
//!    ▼            ▼                        └────────────────────────────────┘
//! cancelled   cancelled                              (pickup)
//! ```
//!
//! `delivered` and `cancelled` are terminal. Which edges an actor may take is
//! gated by [`ActorRole`]; drivers are additionally limited to orders they can
//! see (see [`super::visibility`]).

use super::types::{DriverRef, Order, OrderStatus, OrderType};
use super::visibility::is_visible_to_driver;
use crate::error::{OrderError, OrderResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Console role issuing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Kitchen,
    Driver,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Kitchen => "kitchen",
            ActorRole::Driver => "driver",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ActorRole::Admin),
            "kitchen" => Ok(ActorRole::Kitchen),
            "driver" => Ok(ActorRole::Driver),
            other => Err(format!("Unknown actor role: {}", other)),
        }
    }
}

/// Actor issuing a command (drivers carry their identity)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Admin,
    Kitchen,
    Driver(DriverRef),
}

impl Actor {
    pub fn driver(id: impl Into<String>, name: impl Into<String>) -> Self {
        Actor::Driver(DriverRef::new(id, name))
    }

    pub fn role(&self) -> ActorRole {
        match self {
            Actor::Admin => ActorRole::Admin,
            Actor::Kitchen => ActorRole::Kitchen,
            Actor::Driver(_) => ActorRole::Driver,
        }
    }
}

/// Outgoing edges of the status graph (order type not considered)
pub fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Preparing, Cancelled],
        Preparing => &[Ready],
        Ready => &[OutForDelivery, Delivered],
        OutForDelivery => &[Delivered],
        Delivered | Cancelled => &[],
    }
}

/// Validate an edge of the graph, including the order-type gated edges out of
/// `ready` (`out-for-delivery` for delivery, `delivered` for pickup).
pub fn check_edge(order_type: OrderType, from: OrderStatus, to: OrderStatus) -> OrderResult<()> {
    let in_graph = allowed_targets(from).contains(&to);
    let type_ok = match (from, to) {
        (OrderStatus::Ready, OrderStatus::OutForDelivery) => order_type == OrderType::Delivery,
        (OrderStatus::Ready, OrderStatus::Delivered) => order_type == OrderType::Pickup,
        _ => true,
    };
    if in_graph && type_ok {
        Ok(())
    } else {
        Err(OrderError::InvalidTransition { from, to })
    }
}

/// Edges a role may take (assumes the edge itself is legal)
fn role_permits(role: ActorRole, from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match role {
        ActorRole::Admin => true,
        ActorRole::Kitchen => matches!(
            (from, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Preparing)
                | (Confirmed, Cancelled)
                | (Preparing, Ready)
                | (Ready, Delivered)
        ),
        ActorRole::Driver => matches!(
            (from, to),
            (Ready, OutForDelivery) | (OutForDelivery, Delivered)
        ),
    }
}

/// Pure transition check: (current status, requested status, role) → new status
pub fn transition(
    order_type: OrderType,
    from: OrderStatus,
    to: OrderStatus,
    role: ActorRole,
) -> OrderResult<OrderStatus> {
    check_edge(order_type, from, to)?;
    if !role_permits(role, from, to) {
        return Err(OrderError::role_not_permitted(
            role,
            format!("move an order from {} to {}", from, to),
        ));
    }
    Ok(to)
}

/// Full validation of a status change requested by `actor` on `order`.
///
/// `driver` is an optional assignment change carried with the request.
pub fn validate_status_change(
    order: &Order,
    to: OrderStatus,
    actor: &Actor,
    driver: Option<&DriverRef>,
) -> OrderResult<()> {
    transition(order.order_type, order.status, to, actor.role())?;

    if let Actor::Driver(me) = actor
        && !is_visible_to_driver(order, &me.id)
    {
        return Err(OrderError::NotVisible {
            order_id: order.order_id.clone(),
            driver_id: me.id.clone(),
        });
    }

    if let Some(d) = driver {
        validate_assignment(order, to, Some(d))?;
        // 司机只能把订单分配给自己
        if let Actor::Driver(me) = actor
            && me.id != d.id
        {
            return Err(OrderError::role_not_permitted(
                ActorRole::Driver,
                "assign an order to another driver",
            ));
        }
    }
    Ok(())
}

/// Validate a driver assignment change against the order and the status the
/// order will be in once the change applies.
pub fn validate_assignment(
    order: &Order,
    status: OrderStatus,
    driver: Option<&DriverRef>,
) -> OrderResult<()> {
    if order.order_type != OrderType::Delivery {
        return Err(OrderError::InvalidAssignment(format!(
            "order {} is a {} order and cannot carry a driver",
            order.order_id, order.order_type
        )));
    }
    if !status.accepts_driver_assignment() {
        return Err(OrderError::InvalidAssignment(format!(
            "driver can only change while ready or out-for-delivery (order {} is {})",
            order.order_id, status
        )));
    }
    if let Some(d) = driver
        && d.id.trim().is_empty()
    {
        return Err(OrderError::InvalidAssignment(
            "driver id must not be empty".to_string(),
        ));
    }
    Ok(())
}
