//! 帧读写
//!
//! One reader for hub and consoles. Reads are bounded by `MAX_PAYLOAD_LEN`
//! (checked in [`FrameHeader::decode`]) before the payload is allocated.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{BusMessage, FrameError, FrameHeader, HEADER_LEN};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection closed by peer")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
}

/// 从异步流中读取 BusMessage
///
/// EOF on a frame boundary is [`TransportError::Closed`].
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<BusMessage, TransportError> {
    let mut header = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Closed);
        }
        Err(e) => return Err(e.into()),
    }
    let header = FrameHeader::decode(&header)?;

    let mut payload = vec![0u8; header.payload_len];
    reader.read_exact(&mut payload).await?;

    Ok(BusMessage {
        message_id: header.message_id,
        event_type: header.event_type,
        payload,
    })
}

/// 向异步流写入 BusMessage
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &BusMessage,
) -> Result<(), TransportError> {
    writer.write_all(&msg.encode()).await?;
    writer.flush().await?;
    Ok(())
}
