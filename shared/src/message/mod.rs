//! 消息总线消息类型定义
//!
//! Shared between `order-hub` and consoles for the push channel.
//!
//! # Frame layout
//!
//! ```text
//! ┌──────────┬──────────────────┬─────────────┬──────────────┐
//! │ type: u8 │ message id: 16 B │ len: u32 LE │ JSON payload │
//! └──────────┴──────────────────┴─────────────┴──────────────┘
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod io;
pub mod payload;
pub use io::{TransportError, read_frame, write_frame};
pub use payload::*;

/// Frame header length: type (1) + message id (16) + payload length (4)
pub const HEADER_LEN: usize = 21;

/// Upper bound for a single payload (snapshot of a busy day fits comfortably)
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// Push channel event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    Connected = 0,
    InitialOrders = 1,
    NewOrder = 2,
    UpdateOrderStatus = 3,
}

impl TryFrom<u8> for EventType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventType::Connected),
            1 => Ok(EventType::InitialOrders),
            2 => Ok(EventType::NewOrder),
            3 => Ok(EventType::UpdateOrderStatus),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Connected => write!(f, "connected"),
            EventType::InitialOrders => write!(f, "initialOrders"),
            EventType::NewOrder => write!(f, "newOrder"),
            EventType::UpdateOrderStatus => write!(f, "updateOrderStatus"),
        }
    }
}

/// Frame codec errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Invalid event type: {0}")]
    InvalidEventType(u8),

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Invalid payload for {event_type}: {source}")]
    Payload {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub event_type: EventType,
    pub message_id: Uuid,
    pub payload_len: usize,
}

impl FrameHeader {
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self, FrameError> {
        let event_type =
            EventType::try_from(buf[0]).map_err(|_| FrameError::InvalidEventType(buf[0]))?;

        let mut id = [0u8; 16];
        id.copy_from_slice(&buf[1..17]);

        let mut len = [0u8; 4];
        len.copy_from_slice(&buf[17..21]);
        let payload_len = u32::from_le_bytes(len) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(FrameError::PayloadTooLarge(payload_len));
        }

        Ok(Self {
            event_type,
            message_id: Uuid::from_bytes(id),
            payload_len,
        })
    }
}

/// A framed push channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub message_id: Uuid,
    pub event_type: EventType,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn new(event_type: EventType, payload: Vec<u8>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            event_type,
            payload,
        }
    }

    fn json<T: Serialize>(event_type: EventType, data: &T) -> Result<Self, FrameError> {
        let payload = serde_json::to_vec(data)
            .map_err(|source| FrameError::Payload { event_type, source })?;
        Ok(Self::new(event_type, payload))
    }

    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, FrameError> {
        serde_json::from_slice(&self.payload).map_err(|source| FrameError::Payload {
            event_type: self.event_type,
            source,
        })
    }

    /// Typed event → frame
    pub fn from_event(event: &OrderEvent) -> Result<Self, FrameError> {
        match event {
            OrderEvent::Connected { connection_id } => Self::json(
                EventType::Connected,
                &ConnectedPayload {
                    connection_id: connection_id.clone(),
                },
            ),
            OrderEvent::Initial(orders) => Self::json(
                EventType::InitialOrders,
                &InitialOrdersPayload {
                    orders: orders.clone(),
                    count: orders.len(),
                },
            ),
            OrderEvent::Created { order, timestamp } => Self::json(
                EventType::NewOrder,
                &OrderChangePayload {
                    order: order.clone(),
                    kind: ChangeKind::Created,
                    timestamp: *timestamp,
                },
            ),
            OrderEvent::Updated { order, timestamp } => Self::json(
                EventType::UpdateOrderStatus,
                &OrderChangePayload {
                    order: order.clone(),
                    kind: ChangeKind::Updated,
                    timestamp: *timestamp,
                },
            ),
        }
    }

    /// Frame → typed event
    pub fn to_event(&self) -> Result<OrderEvent, FrameError> {
        Ok(match self.event_type {
            EventType::Connected => {
                let p: ConnectedPayload = self.parse_payload()?;
                OrderEvent::Connected {
                    connection_id: p.connection_id,
                }
            }
            EventType::InitialOrders => {
                let p: InitialOrdersPayload = self.parse_payload()?;
                OrderEvent::Initial(p.orders)
            }
            EventType::NewOrder => {
                let p: OrderChangePayload = self.parse_payload()?;
                OrderEvent::Created {
                    order: p.order,
                    timestamp: p.timestamp,
                }
            }
            EventType::UpdateOrderStatus => {
                let p: OrderChangePayload = self.parse_payload()?;
                OrderEvent::Updated {
                    order: p.order,
                    timestamp: p.timestamp,
                }
            }
        })
    }

    /// Serialize header + payload into one buffer
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_LEN + self.payload.len());
        data.push(self.event_type as u8);
        data.extend_from_slice(self.message_id.as_bytes());
        data.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        data.extend_from_slice(&self.payload);
        data
    }
}
