//! 事件广播器
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Broadcaster                       │
//! │  DashMap<connection_id, mpsc::Sender<SharedEvent>>   │
//! └───────────────┬──────────────────────┬───────────────┘
//!                 │ try_send             │ try_send
//!                 ▼                      ▼
//!          Subscription            Subscription
//!       (TCP push connection)   (in-process console)
//! ```
//!
//! Publishing never blocks the writer: every subscriber owns a bounded queue
//! and a subscriber whose queue is full or closed is dropped from the fan-out
//! set. A dropped console reconnects and receives a fresh snapshot.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::RwLock;
use shared::message::OrderEvent;
use shared::order::Order;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Arc-wrapped OrderEvent (fan-out shares one allocation)
pub type SharedEvent = Arc<OrderEvent>;

type Registry = DashMap<String, mpsc::Sender<SharedEvent>>;

/// Every subscriber queue holds at least `connected` + `initialOrders`
const MIN_BUFFER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("Broadcaster is not running")]
    NotRunning,
}

/// 广播器生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// 事件广播器 - 订单变更的发布/订阅中心
///
/// # 职责
///
/// - 订阅者注册表 (subscribe, Subscription drop)
/// - 事件扇出 (publish)
/// - 生命周期 (start, stop)
///
/// Callers that need the snapshot to be consistent with later deltas must
/// hold the store's write gate across `subscribe` (see `OrdersManager`).
#[derive(Debug, Clone)]
pub struct Broadcaster {
    subscribers: Arc<Registry>,
    buffer: usize,
    lifecycle: Arc<RwLock<Lifecycle>>,
    shutdown_token: CancellationToken,
}

impl Broadcaster {
    /// Per-subscriber queue capacity
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Arc::new(DashMap::new()),
            buffer: buffer.max(MIN_BUFFER),
            lifecycle: Arc::new(RwLock::new(Lifecycle::Idle)),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn start(&self) -> Result<(), BroadcastError> {
        let mut lifecycle = self.lifecycle.write();
        match *lifecycle {
            Lifecycle::Stopped => Err(BroadcastError::NotRunning),
            Lifecycle::Running => Ok(()),
            Lifecycle::Idle => {
                *lifecycle = Lifecycle::Running;
                tracing::info!(buffer = self.buffer, "Broadcaster started");
                Ok(())
            }
        }
    }

    /// 停止广播器
    ///
    /// Cancels the shutdown token (push server and connection tasks exit) and
    /// releases every subscriber queue. A stopped broadcaster cannot restart.
    pub fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.write();
            if *lifecycle == Lifecycle::Stopped {
                return;
            }
            *lifecycle = Lifecycle::Stopped;
        }
        self.shutdown_token.cancel();
        let count = self.subscribers.len();
        self.subscribers.clear();
        tracing::info!(released = count, "Broadcaster stopped");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.read()
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// Register a subscriber and queue `connected` + `initialOrders`
    ///
    /// `snapshot` must already be ordered newest first.
    pub fn subscribe(&self, snapshot: Vec<Order>) -> Result<Subscription, BroadcastError> {
        if !self.is_running() {
            return Err(BroadcastError::NotRunning);
        }

        let connection_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.buffer);

        // Capacity is at least MIN_BUFFER, so both sends fit
        let connected = OrderEvent::Connected {
            connection_id: connection_id.clone(),
        };
        let count = snapshot.len();
        let _ = tx.try_send(Arc::new(connected));
        let _ = tx.try_send(Arc::new(OrderEvent::Initial(snapshot)));

        self.subscribers.insert(connection_id.clone(), tx);
        tracing::debug!(
            connection_id = %connection_id,
            snapshot = count,
            subscribers = self.subscribers.len(),
            "Subscriber registered"
        );

        Ok(Subscription {
            connection_id,
            rx,
            registry: Arc::downgrade(&self.subscribers),
        })
    }

    /// 发布事件到所有订阅者
    ///
    /// Returns the number of subscribers the event was queued for.
    pub fn publish(&self, event: OrderEvent) -> usize {
        if !self.is_running() {
            tracing::debug!("Broadcaster not running, event discarded");
            return 0;
        }

        let event = Arc::new(event);
        let mut delivered = 0;
        let mut dropped = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        connection_id = %entry.key(),
                        "Subscriber queue full, dropping slow subscriber"
                    );
                    dropped.push(entry.key().clone());
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = %entry.key(), "Subscriber closed");
                    dropped.push(entry.key().clone());
                }
            }
        }

        // 迭代结束后再移除，避免 DashMap 分片死锁
        for id in dropped {
            self.subscribers.remove(&id);
        }

        delivered
    }

    pub fn connected_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn connected_subscribers(&self) -> Vec<String> {
        self.subscribers.iter().map(|e| e.key().clone()).collect()
    }
}

/// 订阅句柄
///
/// Dropping the handle unregisters it from the broadcaster.
#[derive(Debug)]
pub struct Subscription {
    connection_id: String,
    rx: mpsc::Receiver<SharedEvent>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Next event; `None` once the broadcaster released this subscriber
    pub async fn recv(&mut self) -> Option<SharedEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<SharedEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.connection_id);
        }
    }
}
