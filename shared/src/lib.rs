//! Shared types for the order hub
//!
//! Domain and wire types used by both `order-hub` (server) and
//! `console-client` (kitchen / admin / driver consoles):
//!
//! - [`order`]: order records, the status transition graph and the
//!   driver visibility resolver
//! - [`message`]: push channel events and the binary frame codec
//! - [`request`] / [`response`]: HTTP command payloads
//! - [`error`]: domain error taxonomy

pub mod error;
pub mod message;
pub mod order;
pub mod request;
pub mod response;
pub mod util;

// Re-exports
pub use error::{OrderError, OrderResult};
pub use message::{BusMessage, EventType, OrderEvent};
pub use order::{
    Actor, ActorRole, ConsoleView, Customer, DriverRef, Order, OrderItem, OrderStatus, OrderType,
    Supplement,
};
pub use response::{ApiResponse, CleanupReport};
