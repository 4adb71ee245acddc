//! Order domain
//!
//! - [`types`]: the order record and its line items
//! - [`money`]: decimal line / order totals
//! - [`transition`]: status graph and role gating
//! - [`visibility`]: per-console filtering and driver actions

pub mod money;
pub mod transition;
pub mod types;
pub mod visibility;

// Re-exports
pub use transition::{Actor, ActorRole, allowed_targets, check_edge, transition};
pub use types::*;
pub use visibility::{ConsoleView, driver_actions, filter_orders, is_visible_to_driver};
