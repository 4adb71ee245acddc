//! 本地订单视图
//!
//! One merge rule for every source:
//!
//! | Source | Present | Absent |
//! |--------|---------|--------|
//! | `PushCreated` | overwrite in place | prepend |
//! | `PushUpdated` | overwrite in place | ignore |
//! | `Snapshot` | overwrite in place | append |
//!
//! An incoming copy whose `updated_at` is older than the local one never
//! overwrites it. Snapshots (push `initialOrders` and every pull) replace the
//! view wholesale, then run each order through the table above so a list with
//! a repeated id still yields one entry. A pull that raced a push is merged
//! with [`OrderView::merge_snapshot`] instead, so nothing pushed meanwhile is
//! dropped.

use shared::message::OrderEvent;
use shared::order::{ConsoleView, Order, OrderStatus, driver_actions};

/// Where an order reached the view from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSource {
    PushCreated,
    PushUpdated,
    /// Member of a full snapshot (push or pull), already in display order
    Snapshot,
}

/// Local order set keyed by `order_id`, newest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderView {
    orders: Vec<Order>,
}

impl OrderView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a single order; returns whether the view changed
    pub fn merge(&mut self, order: Order, source: MergeSource) -> bool {
        match self.position(&order.order_id) {
            Some(i) => {
                let current = &self.orders[i];
                if *current == order {
                    return false;
                }
                if order.updated_at < current.updated_at {
                    tracing::debug!(
                        order_id = %order.order_id,
                        local = current.updated_at,
                        incoming = order.updated_at,
                        "Stale copy ignored"
                    );
                    return false;
                }
                self.orders[i] = order;
                true
            }
            None => match source {
                MergeSource::PushCreated => {
                    self.orders.insert(0, order);
                    true
                }
                MergeSource::PushUpdated => {
                    tracing::debug!(order_id = %order.order_id, "Update for unknown order ignored");
                    false
                }
                MergeSource::Snapshot => {
                    self.orders.push(order);
                    true
                }
            },
        }
    }

    /// Replace the whole view with a snapshot
    ///
    /// A local copy newer than its snapshot row survives the replacement.
    pub fn apply_snapshot(&mut self, orders: Vec<Order>) -> bool {
        let previous = std::mem::take(&mut self.orders);
        for order in orders {
            let order = match previous.iter().find(|o| o.order_id == order.order_id) {
                Some(local) if local.updated_at > order.updated_at => local.clone(),
                _ => order,
            };
            self.merge(order, MergeSource::Snapshot);
        }
        previous != self.orders
    }

    /// Merge a snapshot without dropping local orders it lacks
    pub fn merge_snapshot(&mut self, orders: Vec<Order>) -> bool {
        let mut changed = false;
        for order in orders {
            changed |= self.merge(order, MergeSource::Snapshot);
        }
        changed
    }

    /// Apply a pushed event; returns whether the view changed
    pub fn apply_event(&mut self, event: &OrderEvent) -> bool {
        match event {
            OrderEvent::Connected { .. } => false,
            OrderEvent::Initial(orders) => self.apply_snapshot(orders.clone()),
            OrderEvent::Created { order, .. } => self.merge(order.clone(), MergeSource::PushCreated),
            OrderEvent::Updated { order, .. } => self.merge(order.clone(), MergeSource::PushUpdated),
        }
    }

    fn position(&self, order_id: &str) -> Option<usize> {
        self.orders.iter().position(|o| o.order_id == order_id)
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.position(order_id).map(|i| &self.orders[i])
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders a console renders, in display order
    pub fn visible(&self, view: &ConsoleView) -> Vec<&Order> {
        self.orders.iter().filter(|o| view.shows(o)).collect()
    }

    /// Buttons a driver console offers for an order
    pub fn actions_for(&self, order_id: &str, driver_id: &str) -> &'static [OrderStatus] {
        self.get(order_id)
            .map(|o| driver_actions(o, driver_id))
            .unwrap_or(&[])
    }
}
