//! Warehouse shuttle routines.
//!
//! The shuttle is position-addressed: writing the target register starts a
//! move and the moving sensor stays high until it arrives. Each routine is
//! a fixed move / fork sequence; the slot decision is taken from the
//! [`WarehouseAllocator`] and committed only after the shuttle is home.
//!
//! ```text
//! store:    pickup → fork out, lift, retract → slot → fork in, lower, retract → home → occupy
//! retrieve: slot → fork in, lift, retract → drop-off → fork out, lower, retract → home → free
//! ```
//!
//! One routine at a time: a trigger arriving while the shuttle is busy is
//! dropped, not queued. Every step and every poll slice re-checks the
//! machine state; leaving Running aborts the routine with the shuttle
//! outputs off and nothing committed.

use crate::config::ShuttleConfig;
use crate::context::PlantContext;
use crate::orders::OrderManager;
use crate::sync::{BusyFlag, BusyGuard};
use crate::warehouse::{SlotPos, WarehouseAllocator};
use parking_lot::Mutex;
use plant::color::BoxColor;
use plant::config::seconds;
use plant::io::ActuatorAddr;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

// ─── Stock queue ────────────────────────────────────────────────────

/// Colors of boxes routed to generic stock, in arrival order.
#[derive(Debug, Default)]
pub struct StockQueue {
    colors: Mutex<VecDeque<BoxColor>>,
}

impl StockQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a box heading to stock.
    pub fn push(&self, color: BoxColor) {
        self.colors.lock().push_back(color);
    }

    /// Color of the oldest box heading to stock.
    pub fn pop(&self) -> Option<BoxColor> {
        self.colors.lock().pop_front()
    }

    /// Color of the oldest box heading to stock, left in the queue.
    pub fn peek(&self) -> Option<BoxColor> {
        self.colors.lock().front().copied()
    }

    /// Boxes recorded.
    pub fn len(&self) -> usize {
        self.colors.lock().len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.colors.lock().is_empty()
    }
}

// ─── Tasks ──────────────────────────────────────────────────────────

/// Shuttle routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuttleTask {
    /// Store the box at the client pickup in the order client's column.
    StoreForClient,
    /// Store the box at the stock pickup in the generic stock columns.
    StoreInStock,
    /// Fetch a box of the order color from stock to the drop-off.
    Retrieve,
}

impl fmt::Display for ShuttleTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShuttleTask::StoreForClient => "store-for-client",
            ShuttleTask::StoreInStock => "store-in-stock",
            ShuttleTask::Retrieve => "retrieve",
        })
    }
}

/// How a routine ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuttleOutcome {
    /// A box was stored and the slot committed.
    Stored(SlotPos),
    /// A box was delivered and the slot freed.
    Retrieved(SlotPos),
    /// Retrieve found no box of the requested color.
    NotInStore,
    /// No free slot for the box; the shuttle returned home loaded.
    Full,
    /// A move timed out, the machine left Running or shutdown was
    /// requested; shuttle outputs are off.
    Aborted,
}

enum Abort {
    Timeout(i16),
    Stopped,
    Shutdown,
    Write(i16),
}

type Step<T = ()> = Result<T, Abort>;

// ─── Controller ─────────────────────────────────────────────────────

/// Runs one shuttle routine at a time.
pub struct ShuttleController {
    ctx: Arc<PlantContext>,
    config: ShuttleConfig,
    warehouse: Arc<WarehouseAllocator>,
    orders: Arc<OrderManager>,
    stock: Arc<StockQueue>,
    busy: BusyFlag,
}

impl ShuttleController {
    /// Create an idle shuttle.
    pub fn new(
        ctx: Arc<PlantContext>,
        config: ShuttleConfig,
        warehouse: Arc<WarehouseAllocator>,
        orders: Arc<OrderManager>,
        stock: Arc<StockQueue>,
    ) -> Self {
        Self {
            ctx,
            config,
            warehouse,
            orders,
            stock,
            busy: BusyFlag::new(),
        }
    }

    /// Whether a routine is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Start `task` on a worker thread.
    ///
    /// Returns `false` if the trigger was dropped: machine not running,
    /// shuttle busy, or the thread could not be spawned.
    pub fn start(self: &Arc<Self>, task: ShuttleTask) -> bool {
        let Some(guard) = self.claim(task) else {
            return false;
        };
        let me = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("shuttle-{task}"))
            .spawn(move || {
                me.run(task, guard);
            });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                warn!(%task, error = %e, "Failed to spawn shuttle routine");
                false
            }
        }
    }

    /// Run `task` on the calling thread. `None` if the trigger was dropped.
    pub fn execute(&self, task: ShuttleTask) -> Option<ShuttleOutcome> {
        let guard = self.claim(task)?;
        Some(self.run(task, guard))
    }

    fn claim(&self, task: ShuttleTask) -> Option<BusyGuard> {
        if !self.ctx.is_running() {
            info!(%task, "Shuttle trigger ignored, machine not running");
            return None;
        }
        let guard = self.busy.try_acquire();
        if guard.is_none() {
            info!(%task, "Shuttle busy, trigger dropped");
        }
        guard
    }

    fn run(&self, task: ShuttleTask, _guard: BusyGuard) -> ShuttleOutcome {
        info!(%task, "Shuttle routine started");
        let result = match task {
            ShuttleTask::StoreForClient => self.store_for_client(),
            ShuttleTask::StoreInStock => self.store_in_stock(),
            ShuttleTask::Retrieve => self.retrieve(),
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(abort) => {
                match abort {
                    Abort::Timeout(target) => {
                        error!(%task, target, "Shuttle move timed out, routine aborted")
                    }
                    Abort::Write(target) => {
                        error!(%task, target, "Shuttle target write failed, routine aborted")
                    }
                    Abort::Stopped => warn!(
                        %task,
                        state = %self.ctx.machine_state(),
                        "Shuttle routine interrupted, machine not running"
                    ),
                    Abort::Shutdown => warn!(%task, "Shuttle routine interrupted by shutdown"),
                }
                self.outputs_off();
                ShuttleOutcome::Aborted
            }
        };
        info!(%task, ?outcome, "Shuttle routine finished");
        outcome
    }

    // ─── Routines ───────────────────────────────────────────────────

    fn store_for_client(&self) -> Step<ShuttleOutcome> {
        let order = self.orders.store().get_config();
        let client = order.order_client.clone();
        self.store(self.config.client_pickup, order.order_color, Some(&client), || {
            self.warehouse.find_next_free_client_slot(&client)
        })
    }

    /// The box color leaves the stock queue only once the routine completes;
    /// an aborted store keeps it for the retry.
    fn store_in_stock(&self) -> Step<ShuttleOutcome> {
        let color = self.stock.peek().unwrap_or_else(|| {
            warn!("Stock queue empty, storing box as other");
            BoxColor::Other
        });
        let outcome = self.store(self.config.stock_pickup, color, None, || {
            self.warehouse.find_next_free_stock_slot()
        })?;
        self.stock.pop();
        Ok(outcome)
    }

    fn store(
        &self,
        pickup: i16,
        color: BoxColor,
        owner: Option<&str>,
        choose: impl FnOnce() -> Option<SlotPos>,
    ) -> Step<ShuttleOutcome> {
        let a = &self.ctx.map().actuators;
        self.move_to(pickup, seconds(self.config.first_move_settle_s))?;
        self.pick(a.shuttle_extend_out)?;

        let Some(slot) = choose() else {
            error!(%color, "No free slot, returning home loaded");
            self.move_to(self.config.home, seconds(self.config.move_settle_s))?;
            return Ok(ShuttleOutcome::Full);
        };
        self.move_to(slot_target(slot), seconds(self.config.move_settle_s))?;
        self.place(a.shuttle_extend_in)?;
        self.move_to(self.config.home, seconds(self.config.move_settle_s))?;

        self.warehouse.occupy(slot.column, slot.row, color, owner);
        info!("Warehouse map\n{}", self.warehouse.render());
        Ok(ShuttleOutcome::Stored(slot))
    }

    fn retrieve(&self) -> Step<ShuttleOutcome> {
        let a = &self.ctx.map().actuators;
        self.ctx.write(a.light_retrieving, true);
        let result = self.fetch();
        self.ctx.write(a.light_in_store, false);
        self.ctx.write(a.light_retrieving, false);
        result
    }

    fn fetch(&self) -> Step<ShuttleOutcome> {
        let a = &self.ctx.map().actuators;
        self.ctx.write(a.shuttle_lift, false);

        let color = self.orders.store().get_config().order_color;
        let Some(slot) = self
            .warehouse
            .find_occupied_by_color(color)
            .and_then(SlotPos::from_address)
        else {
            warn!(%color, "Requested product not in store");
            self.ctx.write(a.light_not_in_store, true);
            let paused = self.pause(seconds(self.config.not_in_store_s));
            self.ctx.write(a.light_not_in_store, false);
            paused?;
            return Ok(ShuttleOutcome::NotInStore);
        };
        self.ctx.write(a.light_in_store, true);

        self.move_to(slot_target(slot), seconds(self.config.first_move_settle_s))?;
        self.pick(a.shuttle_extend_in)?;
        self.move_to(self.config.drop_off, seconds(self.config.move_settle_s))?;
        self.place(a.shuttle_extend_out)?;
        self.move_to(self.config.home, seconds(self.config.move_settle_s))?;

        self.warehouse.free(slot.address());
        info!("Warehouse map\n{}", self.warehouse.render());
        Ok(ShuttleOutcome::Retrieved(slot))
    }

    // ─── Steps ──────────────────────────────────────────────────────

    fn move_to(&self, target: i16, settle: Duration) -> Step {
        let r = &self.ctx.map().registers;
        let moving = self.ctx.map().sensors.shuttle_moving;
        self.check()?;
        if !self.ctx.write_register(r.shuttle_target, target) {
            return Err(Abort::Write(target));
        }
        self.pause(settle)?;
        let deadline = Instant::now() + seconds(self.config.move_timeout_s);
        loop {
            self.check()?;
            if !self.ctx.read(moving) {
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Abort::Timeout(target));
            }
            if self.ctx.sleep(self.poll().min(deadline - now)) {
                return Err(Abort::Shutdown);
            }
        }
    }

    /// Fork out towards `side`, lift, retract.
    fn pick(&self, side: ActuatorAddr) -> Step {
        let lift = self.ctx.map().actuators.shuttle_lift;
        self.hold(side, true, self.config.fork_s)?;
        self.hold(lift, true, self.config.fork_s)?;
        self.hold(side, false, self.config.retract_s)
    }

    /// Fork out towards `side`, lower, retract.
    fn place(&self, side: ActuatorAddr) -> Step {
        let lift = self.ctx.map().actuators.shuttle_lift;
        self.hold(side, true, self.config.fork_s)?;
        self.hold(lift, false, self.config.fork_s)?;
        self.hold(side, false, self.config.retract_s)
    }

    fn hold(&self, addr: ActuatorAddr, value: bool, dwell_s: f64) -> Step {
        self.check()?;
        self.ctx.write(addr, value);
        self.pause(seconds(dwell_s))
    }

    /// Sleep `dur` in poll slices, re-checking the machine state each slice.
    fn pause(&self, dur: Duration) -> Step {
        let deadline = Instant::now() + dur;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            if self.ctx.sleep(self.poll().min(deadline - now)) {
                return Err(Abort::Shutdown);
            }
        }
    }

    fn check(&self) -> Step {
        if self.ctx.shutdown().is_triggered() {
            return Err(Abort::Shutdown);
        }
        if !self.ctx.is_running() {
            return Err(Abort::Stopped);
        }
        Ok(())
    }

    fn poll(&self) -> Duration {
        Duration::from_millis(self.config.poll_ms)
    }

    fn outputs_off(&self) {
        let a = &self.ctx.map().actuators;
        self.ctx.write_all(
            &[a.shuttle_lift, a.shuttle_extend_in, a.shuttle_extend_out],
            false,
        );
    }
}

fn slot_target(slot: SlotPos) -> i16 {
    // Slot addresses are 1..=54.
    slot.address() as i16
}
