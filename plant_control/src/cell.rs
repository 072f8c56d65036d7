//! Assembly of the sorting cell.
//!
//! [`Plant`] owns one instance of every subsystem, wired the only way they
//! fit together:
//!
//! ```text
//!  IoBoundary ─► PlantContext ─┬─► TurntableSequencer tt1 ─► ArrivalDispatcher ─┐
//!                              ├─► TurntableSequencer tt2 ─► Tt2Dispatcher ◄────┘
//!                              ├─► LineController                 │
//!                              ├─► ShuttleController ◄── StockQueue ◄┘
//!                              └─► Supervisor
//! ```

use crate::config::PlantConfig;
use crate::context::PlantContext;
use crate::dispatch::{ArrivalDispatcher, ClassificationSink, Tt2Dispatcher, VisionClassifier};
use crate::edge::InhibitFlag;
use crate::error::ControlError;
use crate::events::EventProcessor;
use crate::lines::{LineController, ShuttleController, StockQueue};
use crate::orders::OrderManager;
use crate::supervisor::Supervisor;
use crate::sync::ShutdownToken;
use crate::turntable::{TurntableIo, TurntableSequencer};
use crate::warehouse::WarehouseAllocator;
use plant::hal::{DriverSettings, IoBoundary};
use plant::store::{JsonOrderStore, MemoryOrderStore, OrderConfig, OrderStore};
use plant_hal::{DriverRegistry, ScanLoop};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How long shutdown waits for each dispatcher.
pub const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Every subsystem of the cell.
pub struct Plant {
    ctx: Arc<PlantContext>,
    lines: Arc<LineController>,
    tt1: Arc<TurntableSequencer>,
    tt2: Arc<TurntableSequencer>,
    warehouse: Arc<WarehouseAllocator>,
    orders: Arc<OrderManager>,
    stock: Arc<StockQueue>,
    shuttle: Arc<ShuttleController>,
    arrival: Arc<ArrivalDispatcher>,
    tt2_queue: Arc<Tt2Dispatcher>,
    supervisor: Arc<Supervisor>,
    inhibit: InhibitFlag,
}

impl Plant {
    /// Create the driver named `driver` and the configured order store,
    /// then assemble the plant.
    ///
    /// # Errors
    ///
    /// - `ControlError::Hal` if the driver is unknown or fails to start
    /// - `ControlError::Store` if the order store cannot be opened
    pub fn from_config(config: &PlantConfig, driver: &str) -> Result<Self, ControlError> {
        let registry = DriverRegistry::with_builtin();
        let io = registry.create_driver(
            driver,
            &DriverSettings {
                io: &config.io,
                scan: &config.scan,
                simulation: &config.simulation,
            },
        )?;
        let store = open_store(config)?;
        Ok(Self::build(config, io, store, ShutdownToken::new()))
    }

    /// Assemble the plant over an existing driver and store.
    pub fn build(
        config: &PlantConfig,
        io: Arc<dyn IoBoundary>,
        store: Arc<dyn OrderStore>,
        shutdown: ShutdownToken,
    ) -> Self {
        let ctx = Arc::new(PlantContext::new(io, config.io.clone(), shutdown));
        let map = ctx.map();

        let tt1 = Arc::new(TurntableSequencer::new(
            "tt1",
            TurntableIo::tt1(map),
            config.turntable.clone(),
            Arc::clone(&ctx),
        ));
        let tt2 = Arc::new(TurntableSequencer::new(
            "tt2",
            TurntableIo::tt2(map),
            config.turntable.clone(),
            Arc::clone(&ctx),
        ));
        let lines = Arc::new(LineController::new(Arc::clone(&ctx)));

        let warehouse = Arc::new(WarehouseAllocator::new(&config.warehouse));
        warehouse.seed(&config.warehouse);
        info!("\n{}", warehouse.render());

        let orders = Arc::new(OrderManager::new(store));
        let stock = Arc::new(StockQueue::new());
        let shuttle = Arc::new(ShuttleController::new(
            Arc::clone(&ctx),
            config.shuttle.clone(),
            Arc::clone(&warehouse),
            Arc::clone(&orders),
            Arc::clone(&stock),
        ));

        let tt2_queue = Arc::new(Tt2Dispatcher::new(
            Arc::clone(&ctx),
            config.tt2.clone(),
            Arc::clone(&tt2),
            Arc::clone(&orders),
            Arc::clone(&stock),
        ));
        let inhibit = InhibitFlag::new();
        let arrival = Arc::new(ArrivalDispatcher::new(
            Arc::clone(&ctx),
            config.arrival.clone(),
            Arc::clone(&tt1),
            Arc::clone(&lines),
            VisionClassifier::new(Arc::clone(&ctx), config.classification.clone()),
            Arc::clone(&tt2_queue) as Arc<dyn ClassificationSink>,
            inhibit.clone(),
        ));

        let supervisor = Arc::new(Supervisor::new(
            Arc::clone(&ctx),
            Arc::clone(&lines),
            Arc::clone(&tt1),
            Arc::clone(&tt2),
            Arc::clone(&arrival),
            Arc::clone(&tt2_queue),
        ));
        supervisor.update_lamps();

        Self {
            ctx,
            lines,
            tt1,
            tt2,
            warehouse,
            orders,
            stock,
            shuttle,
            arrival,
            tt2_queue,
            supervisor,
            inhibit,
        }
    }

    /// A scan loop over this plant's I/O.
    pub fn scan_loop(&self, config: &PlantConfig) -> ScanLoop {
        ScanLoop::new(Arc::clone(self.ctx.io()), &config.scan)
    }

    /// Edge processor wired to this plant.
    pub fn event_processor(&self) -> EventProcessor {
        EventProcessor::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.supervisor),
            Arc::clone(&self.lines),
            Arc::clone(&self.arrival),
            Arc::clone(&self.tt2_queue),
            Arc::clone(&self.orders),
            Arc::clone(&self.shuttle),
            self.inhibit.clone(),
        )
    }

    /// Run `scan` until its running flag is cleared, then shut down.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Hal` if the scan loop cannot run.
    pub fn run(&self, scan: &mut ScanLoop) -> Result<(), ControlError> {
        let mut events = self.event_processor();
        let result = scan.run(&mut events);
        self.shutdown();
        result.map_err(ControlError::from)
    }

    /// Stop every worker and de-energize the plant.
    ///
    /// Dispatchers get [`WORKER_JOIN_TIMEOUT`] each; a worker still busy
    /// after that is detached.
    pub fn shutdown(&self) {
        info!("Shutting down plant");
        self.ctx.shutdown().trigger();
        let tt1_done = self.arrival.stop(WORKER_JOIN_TIMEOUT);
        let tt2_done = self.tt2_queue.stop(WORKER_JOIN_TIMEOUT);
        self.tt1.halt();
        self.tt2.halt();
        self.lines.all_off();
        info!(tt1_done, tt2_done, "Plant shut down");
    }

    /// Shared context.
    pub fn ctx(&self) -> &Arc<PlantContext> {
        &self.ctx
    }

    /// Line run/stop.
    pub fn lines(&self) -> &Arc<LineController> {
        &self.lines
    }

    /// Turntable 1.
    pub fn tt1(&self) -> &Arc<TurntableSequencer> {
        &self.tt1
    }

    /// Turntable 2.
    pub fn tt2(&self) -> &Arc<TurntableSequencer> {
        &self.tt2
    }

    /// Warehouse grid.
    pub fn warehouse(&self) -> &Arc<WarehouseAllocator> {
        &self.warehouse
    }

    /// Order queue.
    pub fn orders(&self) -> &Arc<OrderManager> {
        &self.orders
    }

    /// Colors waiting for the stock store routine.
    pub fn stock(&self) -> &Arc<StockQueue> {
        &self.stock
    }

    /// Warehouse shuttle.
    pub fn shuttle(&self) -> &Arc<ShuttleController> {
        &self.shuttle
    }

    /// Turntable-1 queue.
    pub fn arrival(&self) -> &Arc<ArrivalDispatcher> {
        &self.arrival
    }

    /// Turntable-2 queue.
    pub fn tt2_dispatcher(&self) -> &Arc<Tt2Dispatcher> {
        &self.tt2_queue
    }

    /// Operator buttons.
    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }
}

/// Open the JSON order store, or an in-memory one when no path is set.
///
/// # Errors
///
/// Returns `ControlError::Store` if the file exists but cannot be used.
pub fn open_store(config: &PlantConfig) -> Result<Arc<dyn OrderStore>, ControlError> {
    let clients = config.warehouse.client_names();
    match &config.orders.store_path {
        Some(path) => Ok(Arc::new(JsonOrderStore::open(path, &clients)?)),
        None => {
            info!("No order store path, orders are kept in memory");
            Ok(Arc::new(MemoryOrderStore::new(OrderConfig::default())))
        }
    }
}
