//! 推送连接状态机
//!
//! ```text
//! Connecting ──ok──▶ Connected ──lost──▶ Reconnecting{1} ──fail──▶ … ──▶ Offline
//!     │                  ▲                     │                          │
//!     └──fail──▶ Reconnecting{1}               └──────────ok──────────────┤
//!                                                                   refresh()
//! ```
//!
//! `Offline` is sticky: only a manual refresh leaves it.

use std::fmt;
use std::time::Duration;

/// Push channel state as seen by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Offline,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, ConnectionState::Offline)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting { attempt } => write!(f, "reconnecting ({})", attempt),
            ConnectionState::Offline => write!(f, "offline"),
        }
    }
}

/// Fixed-delay, bounded reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// State after `failures` consecutive failed connects
    pub fn after_failures(&self, failures: u32) -> ConnectionState {
        if failures > self.max_attempts {
            ConnectionState::Offline
        } else {
            ConnectionState::Reconnecting { attempt: failures }
        }
    }
}
