use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// 服务器配置 - 订单中心的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (orders.redb, archive.redb, logs) |
/// | HTTP_PORT | 3000 | HTTP API 端口 |
/// | MESSAGE_TCP_PORT | 8081 | TCP 推送端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (unset) | 日志目录，存在时按天滚动写文件 |
/// | ARCHIVE_RETENTION_HOURS | 24 | 订单保留时长 |
/// | CLEANUP_INTERVAL_SECS | 3600 | 清理间隔 |
/// | ARCHIVE_TARGET | Archived Orders | 归档目标名 |
/// | SUBSCRIBER_BUFFER | 256 | 每个订阅者的队列容量 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/orders HTTP_PORT=8080 cargo run -p order-hub
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// TCP 推送端口 (远程控制台直连)
    pub message_tcp_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    /// Orders older than this are archived and removed
    pub archive_retention_hours: u64,
    pub cleanup_interval_secs: u64,
    /// 归档目标 (行簿中的表名)
    pub archive_target: String,
    pub subscriber_buffer: usize,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: env_or("HTTP_PORT", 3000),
            message_tcp_port: env_or("MESSAGE_TCP_PORT", 8081),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            archive_retention_hours: env_or("ARCHIVE_RETENTION_HOURS", 24),
            cleanup_interval_secs: env_or::<u64>("CLEANUP_INTERVAL_SECS", 3600).max(1),
            archive_target: std::env::var("ARCHIVE_TARGET")
                .ok()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Archived Orders".into()),
            subscriber_buffer: env_or("SUBSCRIBER_BUFFER", 256),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(
        work_dir: impl Into<String>,
        http_port: u16,
        message_tcp_port: u16,
    ) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.message_tcp_port = message_tcp_port;
        config
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("orders.redb")
    }

    pub fn archive_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("archive.redb")
    }

    /// 确保工作目录存在
    pub fn ensure_work_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        if let Some(dir) = &self.log_dir {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.archive_retention_hours * 3600)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn tcp_listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.message_tcp_port)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
