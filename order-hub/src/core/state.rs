use std::sync::Arc;
use std::time::Instant;

use crate::archiving::{ArchivePipeline, ArchiveSink, CleanupScheduler, RedbArchiveBook};
use crate::core::{BackgroundTasks, Config, Result, TaskKind};
use crate::message::{Broadcaster, PushServer};
use crate::orders::{OrderStorage, OrdersManager};

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | orders | Arc<OrdersManager> | 订单存储 + 广播 |
/// | scheduler | CleanupScheduler | 归档流水线 + 调度 |
/// | started_at | Instant | 启动时间 (health) |
///
/// 使用 Arc 实现浅拷贝，可直接作为 axum State。
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub orders: Arc<OrdersManager>,
    pub scheduler: CleanupScheduler,
    started_at: Instant,
}

impl ServerState {
    /// Assemble the state from an order store and an archive sink
    pub fn new(config: Config, storage: OrderStorage, sink: Arc<dyn ArchiveSink>) -> Self {
        let broadcaster = Broadcaster::new(config.subscriber_buffer);
        let orders = Arc::new(OrdersManager::new(storage, broadcaster));
        let pipeline = Arc::new(ArchivePipeline::new(
            orders.clone(),
            sink,
            config.archive_target.clone(),
            config.retention(),
        ));
        let scheduler = CleanupScheduler::new(pipeline, config.cleanup_interval());

        Self {
            config,
            orders,
            scheduler,
            started_at: Instant::now(),
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 订单库 (work_dir/orders.redb)
    /// 3. 归档行簿 (work_dir/archive.redb)
    pub fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir()?;

        let storage = OrderStorage::open(config.database_path())?;
        let archive = RedbArchiveBook::open(config.archive_path())?;
        tracing::info!(
            orders = storage.count()?,
            database = %config.database_path().display(),
            archive = %config.archive_path().display(),
            "Order store opened"
        );

        Ok(Self::new(config.clone(), storage, Arc::new(archive)))
    }

    /// Fully in-memory state (nothing touches disk)
    pub fn in_memory(config: Config) -> Result<Self> {
        let storage = OrderStorage::open_in_memory()?;
        let archive = RedbArchiveBook::open_in_memory()?;
        Ok(Self::new(config, storage, Arc::new(archive)))
    }

    /// 启动后台任务
    ///
    /// - 广播器 (Worker, stops on shutdown)
    /// - TCP 推送服务器 (Listener)
    /// - 清理调度器 (Periodic)
    pub fn start_background_tasks(&self, tasks: &mut BackgroundTasks) -> Result<()> {
        let broadcaster = self.orders.broadcaster().clone();
        broadcaster.start()?;
        let shutdown = tasks.shutdown_token();
        tasks.spawn("broadcaster", TaskKind::Worker, async move {
            shutdown.cancelled().await;
            broadcaster.stop();
        });

        let push_server = PushServer::new(self.orders.clone(), self.config.tcp_listen_addr());
        tasks.spawn("push_server", TaskKind::Listener, async move {
            if let Err(e) = push_server.run().await {
                tracing::error!("Push server failed: {}", e);
            }
        });

        let scheduler = self.scheduler.clone();
        let shutdown = tasks.shutdown_token();
        tasks.spawn("cleanup_scheduler", TaskKind::Periodic, scheduler.run(shutdown));

        Ok(())
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        self.orders.broadcaster()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
