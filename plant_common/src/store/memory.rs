//! In-memory order store.

use super::{consume_by_color, OrderConfig, OrderStore, PersistedOrder, StoreError};
use crate::color::BoxColor;
use parking_lot::Mutex;

/// Order store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    config: Mutex<OrderConfig>,
    orders: Mutex<Vec<PersistedOrder>>,
}

impl MemoryOrderStore {
    /// Create a store serving `config`.
    pub fn new(config: OrderConfig) -> Self {
        Self {
            config: Mutex::new(config),
            orders: Mutex::new(Vec::new()),
        }
    }

    /// Replace the order configuration.
    pub fn set_config(&self, config: OrderConfig) {
        *self.config.lock() = config;
    }
}

impl OrderStore for MemoryOrderStore {
    fn get_config(&self) -> OrderConfig {
        self.config.lock().clone()
    }

    fn add_persistent_order(
        &self,
        client: &str,
        color: BoxColor,
        boxes: u32,
        resource: u32,
    ) -> Result<(), StoreError> {
        if boxes == 0 {
            return Err(StoreError::Validation("boxes must be >= 1".to_string()));
        }
        self.orders.lock().push(PersistedOrder {
            client: client.to_string(),
            color,
            boxes_remaining: boxes,
            resource,
        });
        Ok(())
    }

    fn consume_persistent_order_by_color(&self, color: BoxColor) -> Result<bool, StoreError> {
        Ok(consume_by_color(&mut self.orders.lock(), color))
    }

    fn persisted_orders(&self) -> Vec<PersistedOrder> {
        self.orders.lock().clone()
    }
}
