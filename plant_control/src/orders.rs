//! Order queue and fulfillment mode.
//!
//! Orders are served oldest first. Creating an order switches the plant to
//! [`FulfillmentMode::Order`]; consuming the last open box switches it back
//! to [`FulfillmentMode::Stock`]. Every consumed box is mirrored to the
//! injected [`OrderStore`]; store failures are logged and never stop the
//! sequence that consumed the box.

use parking_lot::Mutex;
use plant::color::BoxColor;
use plant::store::{OrderConfig, OrderStore, StoreError};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Where classified boxes go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FulfillmentMode {
    /// Boxes go to production and generic stock.
    #[default]
    Stock,
    /// Boxes matching an open order are delivered to the central line.
    Order,
}

impl fmt::Display for FulfillmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FulfillmentMode::Stock => "stock",
            FulfillmentMode::Order => "order",
        })
    }
}

/// One customer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Requested color.
    pub color: BoxColor,
    /// Boxes requested.
    pub boxes_total: u32,
    /// Boxes delivered so far.
    pub boxes_done: u32,
}

impl Order {
    /// Create an open order.
    pub fn new(color: BoxColor, boxes_total: u32) -> Self {
        Self {
            color,
            boxes_total,
            boxes_done: 0,
        }
    }

    /// Whether every box was delivered.
    pub fn done(&self) -> bool {
        self.boxes_done >= self.boxes_total
    }

    /// Whether a box of `color` counts towards this order.
    pub fn can_fulfill(&self, color: BoxColor) -> bool {
        !self.done() && self.color == color
    }
}

#[derive(Debug, Default)]
struct OrderBook {
    queue: VecDeque<Order>,
    mode: FulfillmentMode,
}

impl OrderBook {
    fn has_pending(&self) -> bool {
        self.queue.iter().any(|o| !o.done())
    }

    fn can_fulfill(&self, color: BoxColor) -> bool {
        self.queue.iter().any(|o| o.can_fulfill(color))
    }

    /// Count one box against the oldest matching order.
    fn consume(&mut self, color: BoxColor) -> Option<Order> {
        let order = self.queue.iter_mut().find(|o| o.can_fulfill(color))?;
        order.boxes_done += 1;
        let snapshot = order.clone();
        while self.queue.front().is_some_and(Order::done) {
            self.queue.pop_front();
        }
        if !self.has_pending() {
            self.mode = FulfillmentMode::Stock;
        }
        Some(snapshot)
    }
}

/// Thread-safe order queue with persistence.
pub struct OrderManager {
    book: Mutex<OrderBook>,
    store: Arc<dyn OrderStore>,
}

impl OrderManager {
    /// Create an empty queue in stock mode.
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self {
            book: Mutex::new(OrderBook::default()),
            store,
        }
    }

    /// The injected store.
    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    /// Current fulfillment mode.
    pub fn mode(&self) -> FulfillmentMode {
        self.book.lock().mode
    }

    /// Append `count` identical orders and switch to order mode.
    pub fn create_order(&self, color: BoxColor, boxes: u32, count: u32) {
        if boxes == 0 {
            warn!(%color, "Order with zero boxes ignored");
            return;
        }
        let count = count.max(1);
        let mut book = self.book.lock();
        for _ in 0..count {
            book.queue.push_back(Order::new(color, boxes));
        }
        book.mode = FulfillmentMode::Order;
        info!(%color, boxes, count, queued = book.queue.len(), "Orders created");
    }

    /// Create orders from the store's order configuration and persist them.
    ///
    /// # Errors
    ///
    /// Returns the first persistence failure; the in-memory orders are
    /// created regardless.
    pub fn create_from_store(&self) -> Result<OrderConfig, StoreError> {
        let config = self.store.get_config();
        self.create_order(config.order_color, config.order_boxes, config.order_count);
        for _ in 0..config.order_count.max(1) {
            self.store.add_persistent_order(
                &config.order_client,
                config.order_color,
                config.order_boxes,
                config.order_resource,
            )?;
        }
        Ok(config)
    }

    /// Whether any order still needs boxes.
    pub fn has_pending(&self) -> bool {
        self.book.lock().has_pending()
    }

    /// Whether an open order accepts a box of `color`.
    pub fn can_fulfill(&self, color: BoxColor) -> bool {
        self.book.lock().can_fulfill(color)
    }

    /// Count one box of `color` against the oldest matching order.
    ///
    /// Returns `false` if no open order matches.
    pub fn consume(&self, color: BoxColor) -> bool {
        let consumed = self.book.lock().consume(color);
        self.finish_consume(color, consumed)
    }

    /// Route decision: in order mode, take one box of `color` for an open
    /// order. Check and consumption happen under one lock.
    pub fn claim(&self, color: BoxColor) -> bool {
        let consumed = {
            let mut book = self.book.lock();
            if book.mode != FulfillmentMode::Order {
                return false;
            }
            book.consume(color)
        };
        self.finish_consume(color, consumed)
    }

    /// Open orders, oldest first.
    pub fn pending_orders(&self) -> Vec<Order> {
        self.book
            .lock()
            .queue
            .iter()
            .filter(|o| !o.done())
            .cloned()
            .collect()
    }

    fn finish_consume(&self, color: BoxColor, consumed: Option<Order>) -> bool {
        let Some(order) = consumed else {
            return false;
        };
        info!(
            %color,
            done = order.boxes_done,
            total = order.boxes_total,
            mode = %self.mode(),
            "Order box consumed"
        );
        match self.store.consume_persistent_order_by_color(color) {
            Ok(true) => {}
            Ok(false) => warn!(%color, "No persisted order matched the consumed box"),
            Err(e) => warn!(%color, error = %e, "Persisted order update failed"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant::store::MemoryOrderStore;

    fn manager() -> (Arc<MemoryOrderStore>, OrderManager) {
        let store = Arc::new(MemoryOrderStore::new(OrderConfig::default()));
        (store.clone(), OrderManager::new(store))
    }

    #[test]
    fn empty_queue_stays_in_stock_mode() {
        let (_, orders) = manager();
        assert_eq!(orders.mode(), FulfillmentMode::Stock);
        assert!(!orders.claim(BoxColor::Green));
        assert!(!orders.has_pending());
    }

    #[test]
    fn green_order_of_two_completes_and_reverts() {
        let (_, orders) = manager();
        orders.create_order(BoxColor::Green, 2, 1);
        assert_eq!(orders.mode(), FulfillmentMode::Order);

        assert!(!orders.claim(BoxColor::Blue));
        assert!(orders.claim(BoxColor::Green));
        assert_eq!(orders.mode(), FulfillmentMode::Order);
        assert_eq!(orders.pending_orders()[0].boxes_done, 1);

        assert!(orders.claim(BoxColor::Green));
        assert_eq!(orders.mode(), FulfillmentMode::Stock);
        assert!(!orders.claim(BoxColor::Green));
    }

    #[test]
    fn any_matching_order_can_fulfill() {
        let (_, orders) = manager();
        orders.create_order(BoxColor::Blue, 1, 1);
        orders.create_order(BoxColor::Green, 1, 2);
        assert!(orders.can_fulfill(BoxColor::Green));
        assert!(orders.consume(BoxColor::Green));
        // Blue order still open at the front.
        assert_eq!(orders.pending_orders().len(), 2);
        assert_eq!(orders.mode(), FulfillmentMode::Order);
    }

    #[test]
    fn zero_boxes_is_ignored() {
        let (_, orders) = manager();
        orders.create_order(BoxColor::Green, 0, 3);
        assert_eq!(orders.mode(), FulfillmentMode::Stock);
    }

    #[test]
    fn create_from_store_persists_each_order() {
        let (store, orders) = manager();
        store.set_config(OrderConfig {
            order_count: 2,
            order_color: BoxColor::Blue,
            order_boxes: 3,
            ..OrderConfig::default()
        });
        let config = orders.create_from_store().unwrap();
        assert_eq!(config.order_color, BoxColor::Blue);
        assert_eq!(orders.pending_orders().len(), 2);
        assert_eq!(store.persisted_orders().len(), 2);

        assert!(orders.claim(BoxColor::Blue));
        assert_eq!(store.persisted_orders()[0].boxes_remaining, 2);
    }
}
