//! 推送通道 - 连接器抽象与 TCP 实现

pub mod transport;

pub use shared::message::{BusMessage, EventType};
pub use transport::{PushConnector, PushStream, TcpConnector, TcpPushStream};
