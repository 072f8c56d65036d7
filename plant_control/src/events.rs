//! Scan snapshot to action mapping.
//!
//! | Sensor | Policy | Action |
//! |--------|--------|--------|
//! | infeed blue/green/other | `FallTriggeredFromHigh` | run that line |
//! | arrival blue/green/other | `RisingEdge` | stop that line, queue arrival |
//! | hall (vision) | `LevelWithInhibit` | queue classification |
//! | turntable-2 load | `RisingEdge` | arm turntable 2 in stock mode |
//! | start / stop | `RisingEdge` | supervisor |
//! | emergency | `Toggle { initial: true }` | supervisor |
//! | restart | `Toggle { initial: false }` | supervisor |
//! | create order | `RisingEdge` | orders from the store |
//! | storage / client warehouse | `RisingEdge` | shuttle store |
//! | retrieve request | `RisingEdge` | shuttle retrieve |
//!
//! Runs on the scan thread: every action either returns at once or hands
//! the work to a queue or a short-lived thread.

use crate::context::PlantContext;
use crate::dispatch::{ArrivalDispatcher, Tt2Dispatcher};
use crate::edge::{Edge, EdgeDetector, EdgePolicy, InhibitFlag};
use crate::lines::{Line, LineController, ShuttleController, ShuttleTask};
use crate::orders::OrderManager;
use crate::supervisor::Supervisor;
use plant::color::BoxColor;
use plant::io::SensorMap;
use plant_hal::ScanHandler;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a registered sensor edge means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A box left the start of an infeed line.
    Infeed(BoxColor),
    /// A box reached the end of an infeed line.
    Arrival(BoxColor),
    /// A box is under the vision sensors.
    Vision,
    /// A box reached the turntable-2 load point.
    Tt2Load,
    /// Start button.
    Start,
    /// Stop button.
    Stop,
    /// Restart button.
    Restart,
    /// Emergency input.
    Emergency,
    /// Create-order button.
    CreateOrder,
    /// A box waits at the stock pickup.
    StockStore,
    /// A box waits at the client pickup.
    ClientStore,
    /// Retrieve button.
    Retrieve,
}

/// Register every sensor the controller reacts to.
pub fn register_signals(detector: &mut EdgeDetector<Signal>, sensors: &SensorMap, inhibit: InhibitFlag) {
    for (color, infeed, arrival) in [
        (BoxColor::Blue, sensors.infeed_blue, sensors.arrival_blue),
        (BoxColor::Green, sensors.infeed_green, sensors.arrival_green),
        (BoxColor::Other, sensors.infeed_other, sensors.arrival_other),
    ] {
        detector.register(infeed, EdgePolicy::FallTriggeredFromHigh, Signal::Infeed(color));
        detector.register(arrival, EdgePolicy::RisingEdge, Signal::Arrival(color));
    }
    detector.register(sensors.hall, EdgePolicy::LevelWithInhibit(inhibit), Signal::Vision);
    detector.register(sensors.emergency, EdgePolicy::Toggle { initial: true }, Signal::Emergency);
    detector.register(sensors.restart, EdgePolicy::Toggle { initial: false }, Signal::Restart);
    for (addr, signal) in [
        (sensors.tt2_load, Signal::Tt2Load),
        (sensors.start, Signal::Start),
        (sensors.stop, Signal::Stop),
        (sensors.create_order, Signal::CreateOrder),
        (sensors.storage_warehouse, Signal::StockStore),
        (sensors.client_warehouse, Signal::ClientStore),
        (sensors.retrieve_request, Signal::Retrieve),
    ] {
        detector.register(addr, EdgePolicy::RisingEdge, signal);
    }
}

/// Turns scan snapshots into plant actions.
pub struct EventProcessor {
    detector: EdgeDetector<Signal>,
    ctx: Arc<PlantContext>,
    supervisor: Arc<Supervisor>,
    lines: Arc<LineController>,
    arrival: Arc<ArrivalDispatcher>,
    tt2_queue: Arc<Tt2Dispatcher>,
    orders: Arc<OrderManager>,
    shuttle: Arc<ShuttleController>,
}

impl EventProcessor {
    /// Create a processor with every signal registered.
    ///
    /// `inhibit` must be the flag the arrival dispatcher arms.
    pub fn new(
        ctx: Arc<PlantContext>,
        supervisor: Arc<Supervisor>,
        lines: Arc<LineController>,
        arrival: Arc<ArrivalDispatcher>,
        tt2_queue: Arc<Tt2Dispatcher>,
        orders: Arc<OrderManager>,
        shuttle: Arc<ShuttleController>,
        inhibit: InhibitFlag,
    ) -> Self {
        let mut detector = EdgeDetector::new();
        register_signals(&mut detector, &ctx.map().sensors, inhibit);
        Self {
            detector,
            ctx,
            supervisor,
            lines,
            arrival,
            tt2_queue,
            orders,
            shuttle,
        }
    }

    /// Detect edges in `snapshot` and act on them, in registration order.
    pub fn handle_scan(&mut self, snapshot: &[bool]) {
        for edge in self.detector.handle_scan(snapshot) {
            self.dispatch(edge);
        }
    }

    fn dispatch(&self, edge: Edge<Signal>) {
        debug!(signal = ?edge.tag, addr = %edge.addr, value = edge.value, "Edge");
        match edge.tag {
            Signal::Infeed(color) => self.lines.run_async(Line::from_color(color)),
            Signal::Arrival(color) => {
                self.lines.stop_async(Line::from_color(color));
                self.arrival.enqueue_arrival(color, edge.addr);
            }
            Signal::Vision => {
                self.arrival.enqueue_classification();
            }
            Signal::Tt2Load => self.arm_tt2(),
            Signal::Start => {
                self.supervisor.on_start();
            }
            Signal::Stop => self.supervisor.on_stop(),
            Signal::Restart => self.supervisor.on_restart(edge.value),
            Signal::Emergency => self.supervisor.on_emergency(edge.value),
            Signal::CreateOrder => self.create_order(),
            Signal::StockStore => self.shuttle_task(ShuttleTask::StoreInStock),
            Signal::ClientStore => self.shuttle_task(ShuttleTask::StoreForClient),
            Signal::Retrieve => self.shuttle_task(ShuttleTask::Retrieve),
        }
    }

    fn create_order(&self) {
        match self.orders.create_from_store() {
            Ok(config) => info!(
                client = %config.order_client,
                color = %config.order_color,
                boxes = config.order_boxes,
                count = config.order_count,
                "Orders registered"
            ),
            Err(e) => warn!(error = %e, "Orders created but not persisted"),
        }
    }

    fn arm_tt2(&self) {
        if !self.ctx.is_running() {
            debug!(state = %self.ctx.machine_state(), "Turntable 2 load ignored");
            return;
        }
        self.tt2_queue.arm_if_idle();
    }

    fn shuttle_task(&self, task: ShuttleTask) {
        if !self.shuttle.start(task) {
            debug!(%task, state = %self.ctx.machine_state(), "Shuttle trigger dropped");
        }
    }
}

impl ScanHandler for EventProcessor {
    fn on_scan(&mut self, snapshot: &[bool]) {
        self.handle_scan(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant::io::SensorAddr;

    fn snapshot(high: &[u16]) -> Vec<bool> {
        let mut s = vec![false; 120];
        for &a in high {
            s[a as usize] = true;
        }
        s
    }

    fn tags(detector: &mut EdgeDetector<Signal>, high: &[u16]) -> Vec<Signal> {
        detector
            .handle_scan(&snapshot(high))
            .into_iter()
            .map(|e| e.tag)
            .collect()
    }

    #[test]
    fn boot_scan_fires_fall_triggered_and_emergency() {
        let mut detector = EdgeDetector::new();
        register_signals(&mut detector, &SensorMap::default(), InhibitFlag::new());
        let fired = tags(&mut detector, &[]);
        assert_eq!(
            fired,
            vec![
                Signal::Infeed(BoxColor::Blue),
                Signal::Infeed(BoxColor::Green),
                Signal::Infeed(BoxColor::Other),
                Signal::Emergency,
            ]
        );
        assert!(tags(&mut detector, &[]).is_empty());
    }

    #[test]
    fn emergency_released_then_start() {
        let mut detector = EdgeDetector::new();
        register_signals(&mut detector, &SensorMap::default(), InhibitFlag::new());
        let idle = [9, 80, 77, 83];
        assert!(tags(&mut detector, &idle).is_empty());
        let mut pressed = idle.to_vec();
        pressed.push(24);
        assert_eq!(tags(&mut detector, &pressed), vec![Signal::Start]);
    }

    #[test]
    fn hall_is_suppressed_while_inhibited() {
        let inhibit = InhibitFlag::new();
        let mut detector = EdgeDetector::new();
        register_signals(&mut detector, &SensorMap::default(), inhibit.clone());
        let base = [9, 80, 77, 83];
        tags(&mut detector, &base);

        inhibit.arm();
        let mut hall = base.to_vec();
        hall.push(90);
        assert!(tags(&mut detector, &hall).is_empty());

        inhibit.clear();
        tags(&mut detector, &base);
        assert_eq!(tags(&mut detector, &hall), vec![Signal::Vision]);
    }

    #[test]
    fn arrival_edge_carries_origin() {
        let mut detector = EdgeDetector::new();
        register_signals(&mut detector, &SensorMap::default(), InhibitFlag::new());
        tags(&mut detector, &[9, 80, 77, 83]);
        let edges = detector.handle_scan(&snapshot(&[9, 80, 77, 83, 78]));
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].tag, Signal::Arrival(BoxColor::Green));
        assert_eq!(edges[0].addr, SensorAddr(78));
    }

    #[test]
    fn tt2_load_is_a_rising_edge() {
        let mut detector = EdgeDetector::new();
        register_signals(&mut detector, &SensorMap::default(), InhibitFlag::new());
        let base = [9, 80, 77, 83];
        tags(&mut detector, &base);
        let mut loaded = base.to_vec();
        loaded.push(96);
        assert_eq!(tags(&mut detector, &loaded), vec![Signal::Tt2Load]);
        assert!(tags(&mut detector, &loaded).is_empty());
        assert!(tags(&mut detector, &base).is_empty());
    }
}
