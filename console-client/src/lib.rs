//! Console Client - 订单控制台同步客户端
//!
//! Keeps a console's local order view consistent with the order hub:
//!
//! - push: framed TCP event stream (`connected`, `initialOrders`, deltas)
//! - pull: periodic `GET /api/orders` that keeps running while push is down
//! - reconnect: fixed delay, bounded attempts, then a persistent `Offline`
//!
//! Commands (`update_status`, `assign_driver`, `trigger_cleanup`) go through
//! [`HttpClient`].

pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod sync;

pub use config::ConsoleConfig;
pub use error::{ClientError, ClientResult};
pub use http::{HttpClient, OrderSource};
pub use message::{PushConnector, PushStream, TcpConnector};
pub use sync::{ConnectionState, ConsoleClient, MergeSource, OrderView, ReconnectPolicy};

// Re-export shared types for convenience
pub use shared::message::OrderEvent;
pub use shared::order::{Actor, ConsoleView, Order, OrderStatus};
