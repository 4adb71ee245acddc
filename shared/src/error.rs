//! Domain error taxonomy
//!
//! Every validation failure is rejected with a specific reason string and a
//! stable error code. The front-end localizes by code.
//!
//! | Code | Error |
//! |------|-------|
//! | E0003 | [`OrderError::NotFound`] |
//! | E0004 | [`OrderError::Conflict`] |
//! | E4001 | [`OrderError::InvalidTransition`] |
//! | E4002 | [`OrderError::RoleNotPermitted`] |
//! | E4003 | [`OrderError::NotVisible`] |
//! | E4004 | [`OrderError::InvalidAssignment`] |
//! | E4005 | [`OrderError::InvalidOrder`] |

use crate::order::{ActorRole, OrderStatus};
use thiserror::Error;

/// Order validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Order already exists: {0}")]
    Conflict(String),

    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Role {role} is not permitted to {action}")]
    RoleNotPermitted { role: ActorRole, action: String },

    #[error("Order {order_id} is not visible to driver {driver_id}")]
    NotVisible { order_id: String, driver_id: String },

    #[error("Invalid driver assignment: {0}")]
    InvalidAssignment(String),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),
}

impl OrderError {
    pub fn code(&self) -> &'static str {
        match self {
            OrderError::NotFound(_) => "E0003",
            OrderError::Conflict(_) => "E0004",
            OrderError::InvalidTransition { .. } => "E4001",
            OrderError::RoleNotPermitted { .. } => "E4002",
            OrderError::NotVisible { .. } => "E4003",
            OrderError::InvalidAssignment(_) => "E4004",
            OrderError::InvalidOrder(_) => "E4005",
        }
    }

    pub fn role_not_permitted(role: ActorRole, action: impl Into<String>) -> Self {
        OrderError::RoleNotPermitted {
            role,
            action: action.into(),
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
