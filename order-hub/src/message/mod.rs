//! 推送通道
//!
//! - [`bus`]: in-process broadcaster and subscriber registry
//! - [`tcp_server`]: network push server for remote consoles

pub mod bus;
pub mod tcp_server;

pub use bus::{BroadcastError, Broadcaster, Lifecycle, SharedEvent, Subscription};
pub use tcp_server::PushServer;
pub use shared::message::{TransportError, read_frame, write_frame};
