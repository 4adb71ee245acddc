//! 控制台配置

use std::time::Duration;

use shared::order::{Actor, ConsoleView};

/// 控制台客户端配置
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// HTTP 基础地址 (e.g. `http://127.0.0.1:3000`)
    pub base_url: String,
    /// TCP 推送地址 (e.g. `127.0.0.1:8081`)
    pub push_addr: String,
    /// 渲染哪一类控制台
    pub view: ConsoleView,
    /// 发出命令的身份 (写入 `x-actor-role` 等请求头)
    pub actor: Actor,
    /// HTTP 请求超时
    pub request_timeout: Duration,
    /// 重连间隔 (固定，不做指数退避)
    pub reconnect_delay: Duration,
    /// 最大重连次数，用尽后进入 Offline
    pub max_reconnect_attempts: u32,
    /// 拉取间隔 (与推送通道独立运行)
    pub poll_interval: Duration,
}

impl ConsoleConfig {
    /// 管理员控制台 (默认)
    pub fn new(base_url: impl Into<String>, push_addr: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            push_addr: push_addr.into(),
            view: ConsoleView::Admin,
            actor: Actor::Admin,
            request_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 3,
            poll_interval: Duration::from_secs(30),
        }
    }

    /// 厨房控制台
    pub fn kitchen(mut self) -> Self {
        self.view = ConsoleView::Kitchen;
        self.actor = Actor::Kitchen;
        self
    }

    /// 司机控制台
    pub fn driver(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        self.view = ConsoleView::Driver(id.clone());
        self.actor = Actor::driver(id, name);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
