//! TCP 推送服务器
//!
//! 负责处理远程控制台连接，包括：
//! - 监听连接
//! - 注册订阅 (connected + initialOrders)
//! - 按订阅顺序写出事件帧
//!
//! Consoles do not send commands over this channel (commands go through
//! HTTP). Any inbound frame is ignored; EOF marks the console as gone.

use std::net::SocketAddr;
use std::sync::Arc;

use shared::message::{BusMessage, TransportError, read_frame, write_frame};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::orders::OrdersManager;

/// 推送服务器
pub struct PushServer {
    manager: Arc<OrdersManager>,
    listen_addr: String,
    shutdown: CancellationToken,
}

impl PushServer {
    /// Server bound to the broadcaster's lifecycle
    pub fn new(manager: Arc<OrdersManager>, listen_addr: impl Into<String>) -> Self {
        let shutdown = manager.broadcaster().shutdown_token().clone();
        Self {
            manager,
            listen_addr: listen_addr.into(),
            shutdown,
        }
    }

    /// Bind and serve until the broadcaster stops
    pub async fn run(self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("Push server listening on {}", self.listen_addr);
        self.serve(listener).await;
        Ok(())
    }

    /// Accept loop on an already bound listener
    pub async fn serve(self, listener: TcpListener) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Push server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Console connected: {}", addr);
                            let manager = self.manager.clone();
                            let shutdown = self.shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, addr, manager, shutdown).await {
                                    tracing::debug!("Console {} handler finished: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }
}

/// Handle a single console connection
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    manager: Arc<OrdersManager>,
    shutdown: CancellationToken,
) -> Result<(), TransportError> {
    let mut subscription = match manager.subscribe() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Rejecting console {}: {}", addr, e);
            return Ok(());
        }
    };
    let connection_id = subscription.connection_id().to_string();
    tracing::info!(connection_id = %connection_id, peer = %addr, "Console subscribed");

    let (mut reader, mut writer) = stream.into_split();

    // 断开检测：读端 EOF 时取消
    let disconnect = shutdown.child_token();
    let reader_token = disconnect.clone();
    let reader_id = connection_id.clone();
    let reader_task = tokio::spawn(async move {
        loop {
            match read_frame(&mut reader).await {
                Ok(msg) => {
                    tracing::debug!(
                        connection_id = %reader_id,
                        event_type = %msg.event_type,
                        "Ignoring inbound frame"
                    );
                }
                Err(TransportError::Closed) => break,
                Err(e) => {
                    tracing::debug!(connection_id = %reader_id, error = %e, "Read failed");
                    break;
                }
            }
        }
        reader_token.cancel();
    });

    let result = loop {
        tokio::select! {
            _ = disconnect.cancelled() => break Ok(()),

            event = subscription.recv() => {
                let Some(event) = event else {
                    tracing::debug!(connection_id = %connection_id, "Released by broadcaster");
                    break Ok(());
                };
                let msg = match BusMessage::from_event(&event) {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::error!(connection_id = %connection_id, error = %e, "Failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = write_frame(&mut writer, &msg).await {
                    break Err(e);
                }
            }
        }
    };

    reader_task.abort();
    let _ = writer.shutdown().await;
    tracing::info!(connection_id = %connection_id, "Console disconnected");
    result
}
