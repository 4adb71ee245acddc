//! OrdersManager - 订单写入与广播
//!
//! Every mutation goes through the write gate:
//!
//! ```text
//! mutate(cmd)
//!     ├─ 1. Acquire write gate
//!     ├─ 2. Load current record
//!     ├─ 3. Validate (state machine / visibility / assignment)
//!     ├─ 4. Persist to redb (commit)
//!     ├─ 5. Publish event
//!     └─ 6. Release gate, return updated order
//! ```
//!
//! Holding the gate across persist + publish keeps each subscriber's event
//! order identical to the store's mutation order, and lets `subscribe` take a
//! snapshot that no concurrent delta can overtake. Concurrent writers are
//! serialized and the last write wins.

use parking_lot::Mutex;
use shared::message::OrderEvent;
use shared::order::money::{line_total, order_total};
use shared::order::transition::{validate_assignment, validate_status_change};
use shared::order::{Actor, ActorRole, DriverRef, Order, OrderItem, OrderStatus, OrderType};
use shared::request::{CreateOrderRequest, StatusUpdateRequest};
use shared::util::{new_order_id, now_millis};
use shared::{OrderError, OrderResult};
use thiserror::Error;

use super::storage::{OrderStorage, StorageError};
use crate::message::{BroadcastError, Broadcaster, Subscription};

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

impl From<StorageError> for ManagerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateOrder(id) => ManagerError::Order(OrderError::Conflict(id)),
            StorageError::OrderNotFound(id) => ManagerError::Order(OrderError::NotFound(id)),
            other => ManagerError::Storage(other),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;

/// 订单管理器
#[derive(Debug)]
pub struct OrdersManager {
    storage: OrderStorage,
    broadcaster: Broadcaster,
    write_gate: Mutex<()>,
}

impl OrdersManager {
    pub fn new(storage: OrderStorage, broadcaster: Broadcaster) -> Self {
        Self {
            storage,
            broadcaster,
            write_gate: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    // ========== Subscriptions ==========

    /// Register a subscriber with a snapshot taken under the write gate
    pub fn subscribe(&self) -> ManagerResult<Subscription> {
        let _gate = self.write_gate.lock();
        let snapshot = self.storage.list_orders()?;
        Ok(self.broadcaster.subscribe(snapshot)?)
    }

    // ========== Commands ==========

    /// Checkout: validate items, compute totals, persist as `pending`
    pub fn create_order(&self, req: CreateOrderRequest) -> ManagerResult<Order> {
        let mut order = build_order(req)?;

        let _gate = self.write_gate.lock();
        let now = now_millis();
        order.created_at = now;
        order.updated_at = now;

        self.storage.insert_order(&order)?;
        let delivered = self.broadcaster.publish(OrderEvent::created(order.clone()));

        tracing::info!(
            order_id = %order.order_id,
            order_type = %order.order_type,
            total = order.total,
            subscribers = delivered,
            "Order created"
        );
        Ok(order)
    }

    /// Apply a status transition requested by `actor`
    pub fn apply_transition(
        &self,
        order_id: &str,
        req: StatusUpdateRequest,
        actor: &Actor,
    ) -> ManagerResult<Order> {
        let _gate = self.write_gate.lock();
        let mut order = self.load(order_id)?;

        if let Err(e) = validate_status_change(&order, req.status, actor, req.driver.as_ref()) {
            tracing::warn!(
                order_id = %order_id,
                from = %order.status,
                to = %req.status,
                role = %actor.role(),
                error = %e,
                "Status change rejected"
            );
            return Err(e.into());
        }

        let from = order.status;
        let now = next_stamp(&order);
        order.status = req.status;
        order.updated_at = now;

        match req.status {
            OrderStatus::Delivered => order.delivered_at = Some(now),
            OrderStatus::Cancelled => order.cancel_reason = req.reason.clone(),
            _ => {}
        }

        if let Some(driver) = req.driver.as_ref() {
            order.set_driver(Some(driver), now);
        } else if let Actor::Driver(me) = actor
            && req.status == OrderStatus::OutForDelivery
            && !order.is_assigned()
        {
            // 未分配订单由出发的司机认领
            order.set_driver(Some(me), now);
        }

        self.storage.update_order(&order)?;
        let delivered = self.broadcaster.publish(OrderEvent::updated(order.clone()));

        tracing::info!(
            order_id = %order.order_id,
            from = %from,
            to = %order.status,
            role = %actor.role(),
            driver = order.assigned_driver_id.as_deref().unwrap_or("-"),
            reason = req.reason.as_deref().unwrap_or(""),
            subscribers = delivered,
            "Order status changed"
        );
        Ok(order)
    }

    /// Set or clear the driver of a delivery order (admin only)
    pub fn assign_driver(
        &self,
        order_id: &str,
        driver: Option<DriverRef>,
        actor: &Actor,
    ) -> ManagerResult<Order> {
        if actor.role() != ActorRole::Admin {
            return Err(OrderError::role_not_permitted(actor.role(), "assign a driver").into());
        }

        let _gate = self.write_gate.lock();
        let mut order = self.load(order_id)?;
        validate_assignment(&order, order.status, driver.as_ref())?;

        let now = next_stamp(&order);
        order.set_driver(driver.as_ref(), now);
        order.updated_at = now;

        self.storage.update_order(&order)?;
        self.broadcaster.publish(OrderEvent::updated(order.clone()));

        tracing::info!(
            order_id = %order.order_id,
            driver = order.assigned_driver_id.as_deref().unwrap_or("-"),
            "Driver assignment changed"
        );
        Ok(order)
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: &str) -> ManagerResult<Order> {
        self.load(order_id)
    }

    /// All orders, newest first
    pub fn list_orders(&self) -> ManagerResult<Vec<Order>> {
        Ok(self.storage.list_orders()?)
    }

    pub fn order_count(&self) -> ManagerResult<u64> {
        Ok(self.storage.count()?)
    }

    // ========== Archival ==========

    /// Orders created before `cutoff`, oldest first
    pub fn select_older_than(&self, cutoff: i64) -> ManagerResult<Vec<Order>> {
        Ok(self.storage.select_created_before(cutoff)?)
    }

    /// Delete orders that were archived
    ///
    /// An order modified after its archived copy was taken is kept; it is
    /// picked up again by the next run. Returns the ids actually deleted.
    pub fn delete_archived(&self, archived: &[Order]) -> ManagerResult<Vec<String>> {
        let _gate = self.write_gate.lock();

        let mut ids = Vec::with_capacity(archived.len());
        for copy in archived {
            match self.storage.get_order(&copy.order_id)? {
                Some(current) if current.updated_at == copy.updated_at => {
                    ids.push(copy.order_id.clone())
                }
                Some(_) => tracing::warn!(
                    order_id = %copy.order_id,
                    "Order changed after archival snapshot, keeping it"
                ),
                None => {}
            }
        }

        let deleted = self.storage.delete_orders(&ids)?;
        if deleted != ids.len() {
            tracing::warn!(expected = ids.len(), deleted, "Delete count mismatch");
        }
        Ok(ids)
    }

    fn load(&self, order_id: &str) -> ManagerResult<Order> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()).into())
    }
}

/// `updated_at` strictly increases per order
fn next_stamp(order: &Order) -> i64 {
    now_millis().max(order.updated_at + 1)
}

fn build_order(req: CreateOrderRequest) -> OrderResult<Order> {
    if req.items.is_empty() {
        return Err(OrderError::InvalidOrder(
            "order must contain at least one item".to_string(),
        ));
    }
    if req.customer.name.trim().is_empty() {
        return Err(OrderError::InvalidOrder(
            "customer name must not be empty".to_string(),
        ));
    }
    if req.order_type == OrderType::Delivery && req.customer.address.trim().is_empty() {
        return Err(OrderError::InvalidOrder(
            "delivery orders require an address".to_string(),
        ));
    }

    let items = req
        .items
        .into_iter()
        .map(|input| {
            let total_price = line_total(input.unit_price, &input.supplements, input.quantity)?;
            Ok(OrderItem {
                name: input.name,
                quantity: input.quantity,
                unit_price: input.unit_price,
                total_price,
                size: input.size,
                supplements: input.supplements,
            })
        })
        .collect::<OrderResult<Vec<_>>>()?;
    let total = order_total(&items);

    let order_id = req
        .order_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_order_id);

    Ok(Order {
        order_id,
        customer: req.customer,
        items,
        total,
        status: OrderStatus::Pending,
        order_type: req.order_type,
        payment_method: req.payment_method,
        assigned_driver_id: None,
        assigned_driver: None,
        created_at: 0,
        updated_at: 0,
        delivered_at: None,
        assigned_at: None,
        cancel_reason: None,
    })
}
