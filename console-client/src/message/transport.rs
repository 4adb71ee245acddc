//! Push channel transport
//!
//! Frames are read with `shared::message::read_frame`, the same bounded
//! reader the hub uses.

use async_trait::async_trait;
use shared::message::{OrderEvent, read_frame};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{ClientError, ClientResult};

/// Opens push channels to the hub
///
/// Every successful `connect` starts with `Connected` followed by `Initial`.
#[async_trait]
pub trait PushConnector: Send + Sync + std::fmt::Debug {
    async fn connect(&self) -> ClientResult<Box<dyn PushStream>>;
}

/// An established push channel; dropping it releases the subscription
#[async_trait]
pub trait PushStream: Send + std::fmt::Debug {
    /// Next event, `Err(ClientError::Closed)` once the hub hung up
    async fn next_event(&mut self) -> ClientResult<OrderEvent>;
}

/// TCP connector
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl PushConnector for TcpConnector {
    async fn connect(&self) -> ClientResult<Box<dyn PushStream>> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| ClientError::Connection(format!("{}: {}", self.addr, e)))?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        tracing::debug!(addr = %self.addr, "Push channel connected");
        Ok(Box::new(TcpPushStream {
            reader,
            _writer: writer,
        }))
    }
}

/// TCP push stream
///
/// The write half is held so the socket stays open; consoles never send.
#[derive(Debug)]
pub struct TcpPushStream {
    reader: OwnedReadHalf,
    _writer: OwnedWriteHalf,
}

#[async_trait]
impl PushStream for TcpPushStream {
    async fn next_event(&mut self) -> ClientResult<OrderEvent> {
        let msg = read_frame(&mut self.reader).await?;
        Ok(msg.to_event()?)
    }
}
