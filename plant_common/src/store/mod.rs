//! Order configuration persistence.
//!
//! The operator prepares the next order (color, box count, client) in a
//! small JSON document; pressing Create-Order reads it back and every
//! order created is persisted until the boxes are delivered.
//!
//! - [`OrderStore`] - the persistence interface injected into the controller
//! - [`JsonOrderStore`] - file-backed store
//! - [`MemoryOrderStore`] - in-memory store for tests and store-less runs

mod json;
mod memory;
mod order_config;

pub use json::JsonOrderStore;
pub use memory::MemoryOrderStore;
pub use order_config::{OrderConfig, DEFAULT_CLIENTS};

use crate::color::BoxColor;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for order store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("Order store I/O error: {0}")]
    Io(String),

    /// The backing document is not valid JSON for the store schema.
    #[error("Order store parse error: {0}")]
    Parse(String),

    /// A value failed validation.
    #[error("Order store validation failed: {0}")]
    Validation(String),
}

/// An order persisted until its boxes are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedOrder {
    /// Client the order belongs to.
    pub client: String,
    /// Requested box color.
    pub color: BoxColor,
    /// Boxes still to deliver.
    pub boxes_remaining: u32,
    /// Resource count requested with the order.
    pub resource: u32,
}

/// Persistence interface for the order configuration and open orders.
pub trait OrderStore: Send + Sync {
    /// Current order configuration.
    fn get_config(&self) -> OrderConfig;

    /// Persist a newly created order.
    fn add_persistent_order(
        &self,
        client: &str,
        color: BoxColor,
        boxes: u32,
        resource: u32,
    ) -> Result<(), StoreError>;

    /// Deliver one box of `color` against the oldest matching persisted order.
    ///
    /// Returns `Ok(false)` if no persisted order of that color is open.
    fn consume_persistent_order_by_color(&self, color: BoxColor) -> Result<bool, StoreError>;

    /// Snapshot of the persisted open orders, oldest first.
    fn persisted_orders(&self) -> Vec<PersistedOrder>;
}

/// Shared consume rule: decrement the first open order of `color`, drop it at zero.
pub(crate) fn consume_by_color(orders: &mut Vec<PersistedOrder>, color: BoxColor) -> bool {
    let Some(idx) = orders
        .iter()
        .position(|o| o.color == color && o.boxes_remaining > 0)
    else {
        return false;
    };
    orders[idx].boxes_remaining -= 1;
    if orders[idx].boxes_remaining == 0 {
        orders.remove(idx);
    }
    true
}
