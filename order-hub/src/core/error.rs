use thiserror::Error;

use crate::archiving::ArchiveError;
use crate::message::{BroadcastError, TransportError};
use crate::orders::StorageError;

/// 服务器启动/运行错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Order storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Broadcaster error: {0}")]
    Broadcast(#[from] BroadcastError),

    #[error("Push server error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
