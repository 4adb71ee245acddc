//! 清理调度器
//!
//! 固定间隔触发归档流水线，并提供手动触发入口。
//!
//! A tick that lands while a run is in progress is skipped, not queued. A
//! manual trigger during a run is reported back as "already running".

use std::sync::Arc;
use std::time::Duration;

use shared::response::CleanupReport;
use shared::util::now_millis;
use tokio::time::{MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::pipeline::{ArchivePipeline, PipelineError, to_report};

/// 清理调度器
///
/// 注册为 `TaskKind::Periodic`。Cloning shares the pipeline and its run guard.
#[derive(Debug, Clone)]
pub struct CleanupScheduler {
    pipeline: Arc<ArchivePipeline>,
    interval: Duration,
}

impl CleanupScheduler {
    pub fn new(pipeline: Arc<ArchivePipeline>, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub fn pipeline(&self) -> &Arc<ArchivePipeline> {
        &self.pipeline
    }

    /// 手动触发一次清理
    pub async fn trigger_now(&self) -> CleanupReport {
        let result = self.pipeline.run().await;
        match &result {
            Err(PipelineError::AlreadyRunning) => {
                tracing::info!("Manual cleanup rejected: already running");
            }
            Err(e) => tracing::warn!(error = %e, "Manual cleanup failed"),
            Ok(_) => {}
        }
        to_report(&result, now_millis())
    }

    /// 主循环：每 `interval` 运行一次，直到 shutdown
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            target_sheet = %self.pipeline.target(),
            "Cleanup scheduler started"
        );

        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        tracing::info!("Cleanup scheduler stopped");
    }

    async fn tick(&self) {
        match self.pipeline.run().await {
            Ok(summary) if summary.archived > 0 => {
                tracing::info!(
                    archived = summary.archived,
                    deleted = summary.deleted,
                    "Scheduled cleanup finished"
                );
            }
            Ok(_) => tracing::debug!("Scheduled cleanup: nothing to archive"),
            Err(PipelineError::AlreadyRunning) => {
                tracing::debug!("Scheduled cleanup skipped: run in progress");
            }
            Err(e) => tracing::error!(error = %e, "Scheduled cleanup failed"),
        }
    }
}
