//! Order Hub - 餐厅订单中心
//!
//! # 架构概述
//!
//! 订单中心持有唯一的订单库，并把每次变更实时推送给三类控制台
//! (kitchen / admin / driver)：
//!
//! - **订单** (`orders`): redb 存储 + 状态机校验 + 写入闸门
//! - **推送** (`message`): 广播器、订阅注册表、TCP 推送服务器
//! - **归档** (`archiving`): 先归档后删除的清理流水线和调度器
//! - **HTTP API** (`api`): 订单命令、查询、手动清理、健康检查
//!
//! # 模块结构
//!
//! ```text
//! order-hub/src/
//! ├── core/          # 配置、状态、后台任务、服务器
//! ├── orders/        # 存储与管理器
//! ├── message/       # 广播与推送
//! ├── archiving/     # 归档流水线
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 错误、日志
//! ```

pub mod api;
pub mod archiving;
pub mod core;
pub mod message;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use archiving::{ArchivePipeline, ArchiveSink, CleanupScheduler, RedbArchiveBook};
pub use crate::core::{BackgroundTasks, Config, Server, ServerState};
pub use message::{Broadcaster, PushServer, Subscription};
pub use orders::{OrderStorage, OrdersManager};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境：准备工作目录、初始化日志
pub fn setup_environment(config: &Config) -> std::io::Result<()> {
    config.ensure_work_dir()?;
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    Ok(())
}
