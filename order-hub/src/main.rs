use order_hub::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载 .env 和配置
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 2. 工作目录 + 日志
    setup_environment(&config)?;
    tracing::info!(
        environment = %config.environment,
        http_port = config.http_port,
        tcp_port = config.message_tcp_port,
        "Order hub starting..."
    );

    // 3. 初始化服务器状态
    let state = ServerState::initialize(&config)?;

    // 4. 启动 HTTP + 后台任务 (Ctrl-C 退出)
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
