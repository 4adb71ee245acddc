//! 订单模块
//!
//! - [`storage`]: redb 持久化
//! - [`manager`]: 校验、写入、广播 (write gate)

pub mod manager;
pub mod storage;

pub use manager::{ManagerError, ManagerResult, OrdersManager};
pub use storage::{OrderStorage, StorageError, StorageResult};
