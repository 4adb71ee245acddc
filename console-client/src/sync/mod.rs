//! 同步模块 - 推送合并 + 拉取兜底

pub mod connection;
pub mod console;
pub mod view;

pub use connection::{ConnectionState, ReconnectPolicy};
pub use console::ConsoleClient;
pub use view::{MergeSource, OrderView};
