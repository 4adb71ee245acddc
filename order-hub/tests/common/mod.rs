//! Shared fixtures for order-hub integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use console_client::{ClientError, ClientResult, OrderEvent, OrderSource, PushConnector, PushStream};
use order_hub::{Broadcaster, OrderStorage, OrdersManager, Subscription};
use parking_lot::Mutex;
use shared::order::{Actor, Customer, Order, OrderStatus, OrderType};
use shared::request::{CreateOrderRequest, OrderItemInput, StatusUpdateRequest};
use tokio_util::sync::CancellationToken;

pub const HOUR_MS: i64 = 3_600_000;

/// In-memory manager with a running broadcaster
pub fn manager() -> Arc<OrdersManager> {
    let storage = OrderStorage::open_in_memory().unwrap();
    manager_with(storage)
}

pub fn manager_with(storage: OrderStorage) -> Arc<OrdersManager> {
    let broadcaster = Broadcaster::new(64);
    broadcaster.start().unwrap();
    Arc::new(OrdersManager::new(storage, broadcaster))
}

pub fn order_request(id: &str, order_type: OrderType) -> CreateOrderRequest {
    CreateOrderRequest {
        order_id: Some(id.to_string()),
        customer: Customer {
            name: "Lucía".to_string(),
            phone: "600123123".to_string(),
            address: "Calle Mayor 5".to_string(),
            email: None,
            notes: None,
        },
        items: vec![OrderItemInput {
            name: "Pizza Margarita".to_string(),
            quantity: 2,
            unit_price: 9.5,
            size: None,
            supplements: vec![],
        }],
        order_type,
        payment_method: "card".to_string(),
    }
}

/// Walk an order through `path` as admin
pub fn advance(manager: &OrdersManager, id: &str, path: &[OrderStatus]) -> Order {
    let mut order = manager.get_order(id).unwrap();
    for status in path {
        order = manager
            .apply_transition(id, StatusUpdateRequest::new(*status), &Actor::Admin)
            .unwrap();
    }
    order
}

pub const TO_READY: &[OrderStatus] = &[
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::Ready,
];

/// In-process push connector over `OrdersManager::subscribe`
///
/// `drop_links` severs every open stream; `set_online(false)` refuses new ones.
#[derive(Debug)]
pub struct InProcessHub {
    manager: Arc<OrdersManager>,
    online: AtomicBool,
    links: Mutex<CancellationToken>,
}

impl InProcessHub {
    pub fn new(manager: Arc<OrdersManager>) -> Arc<Self> {
        Arc::new(Self {
            manager,
            online: AtomicBool::new(true),
            links: Mutex::new(CancellationToken::new()),
        })
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn drop_links(&self) {
        let mut links = self.links.lock();
        links.cancel();
        *links = CancellationToken::new();
    }
}

#[derive(Debug)]
pub struct InProcessStream {
    subscription: Subscription,
    severed: CancellationToken,
}

#[async_trait]
impl PushConnector for InProcessHub {
    async fn connect(&self) -> ClientResult<Box<dyn PushStream>> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("hub unreachable".into()));
        }
        let subscription = self
            .manager
            .subscribe()
            .map_err(|e| ClientError::Connection(e.to_string()))?;
        Ok(Box::new(InProcessStream {
            subscription,
            severed: self.links.lock().clone(),
        }))
    }
}

#[async_trait]
impl PushStream for InProcessStream {
    async fn next_event(&mut self) -> ClientResult<OrderEvent> {
        tokio::select! {
            _ = self.severed.cancelled() => Err(ClientError::Closed),
            event = self.subscription.recv() => {
                event.map(|e| (*e).clone()).ok_or(ClientError::Closed)
            }
        }
    }
}

#[async_trait]
impl OrderSource for InProcessHub {
    async fn fetch_orders(&self) -> ClientResult<Vec<Order>> {
        self.manager
            .list_orders()
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}
