//! Console visibility resolver
//!
//! Decides which orders each console renders and which transitions a driver
//! console may offer.

use super::types::{Order, OrderStatus, OrderType};

/// Which console is looking at the order set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleView {
    Admin,
    Kitchen,
    Driver(String),
}

const KITCHEN_STATUSES: &[OrderStatus] = &[
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
];

const DRIVER_STATUSES: &[OrderStatus] = &[
    OrderStatus::Ready,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

/// A driver sees an order iff it is unassigned or assigned to them
pub fn is_visible_to_driver(order: &Order, driver_id: &str) -> bool {
    match order.assigned_driver_id.as_deref() {
        None => true,
        Some(assigned) => assigned == driver_id,
    }
}

impl ConsoleView {
    pub fn shows(&self, order: &Order) -> bool {
        match self {
            ConsoleView::Admin => true,
            ConsoleView::Kitchen => KITCHEN_STATUSES.contains(&order.status),
            ConsoleView::Driver(driver_id) => {
                order.order_type == OrderType::Delivery
                    && DRIVER_STATUSES.contains(&order.status)
                    && is_visible_to_driver(order, driver_id)
            }
        }
    }
}

/// Filter an order set for a console, preserving input order
pub fn filter_orders<'a>(orders: &'a [Order], view: &ConsoleView) -> Vec<&'a Order> {
    orders.iter().filter(|o| view.shows(o)).collect()
}

/// Transitions a driver console may offer for an order
pub fn driver_actions(order: &Order, driver_id: &str) -> &'static [OrderStatus] {
    if !ConsoleView::Driver(driver_id.to_string()).shows(order) {
        return &[];
    }
    match order.status {
        OrderStatus::Ready => &[OrderStatus::OutForDelivery],
        OrderStatus::OutForDelivery => &[OrderStatus::Delivered],
        _ => &[],
    }
}
