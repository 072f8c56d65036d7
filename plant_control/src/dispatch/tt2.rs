//! Turntable-2 job queue and order routing.
//!
//! ```text
//!  classified(color) ──► order mode && open order for color ?
//!                          yes: Order(color)   (box consumed now)
//!                          no : NoOrder        (color pushed to stock queue)
//!
//!  NoOrder : belt fwd until discharge ─► rotate ─► belt fwd until final
//!            production ─► rotate back
//!  Order   : belt fwd, central line on ─► discharge pulses high then low
//! ```

use super::classify::ClassificationSink;
use super::worker::QueueWorker;
use crate::config::Tt2Config;
use crate::context::PlantContext;
use crate::error::{ControlError, TurntableError};
use crate::lines::StockQueue;
use crate::orders::{FulfillmentMode, OrderManager};
use crate::turntable::{BeltDirection, TurntableCommand, TurntableSequencer};
use plant::color::BoxColor;
use plant::config::seconds;
use plant::io::SensorAddr;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Job on the turntable-2 queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tt2Job {
    /// Standard cycle towards production and stock.
    NoOrder,
    /// Direct discharge to the central line for an open order.
    Order(BoxColor),
}

impl fmt::Display for Tt2Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tt2Job::NoOrder => f.write_str("no-order"),
            Tt2Job::Order(color) => write!(f, "order({color})"),
        }
    }
}

struct Tt2Cycle {
    ctx: Arc<PlantContext>,
    config: Tt2Config,
    tt2: Arc<TurntableSequencer>,
}

impl Tt2Cycle {
    fn handle(&self, job: Tt2Job) {
        let result = match job {
            Tt2Job::NoOrder => self.no_order(),
            Tt2Job::Order(color) => self.order(color),
        };
        match result {
            Ok(()) => debug!(%job, "Turntable 2 cycle complete"),
            Err(TurntableError::NotRunning | TurntableError::ShuttingDown) => {
                debug!(%job, "Turntable 2 cycle abandoned")
            }
            Err(e) => warn!(%job, error = %e, "Turntable 2 cycle aborted"),
        }
    }

    fn no_order(&self) -> Result<(), TurntableError> {
        if !self.ctx.is_running() {
            return Err(TurntableError::NotRunning);
        }
        let sensors = &self.ctx.map().sensors;
        self.ctx
            .write(self.ctx.map().actuators.vision_conveyor, true);

        self.tt2.execute(TurntableCommand::belt(BeltDirection::Forward))?;
        let entry = seconds(self.config.entry_timeout_s);
        if !self.wait(sensors.tt2_discharge, true, entry) {
            warn!(?entry, "Box did not reach the turntable 2 discharge sensor");
        }
        self.tt2.execute(TurntableCommand::stop().turn(true))?;
        self.pause(seconds(self.config.turn_s))?;

        self.tt2.execute(TurntableCommand::belt(BeltDirection::Forward))?;
        let exit = seconds(self.config.exit_timeout_s);
        if !self.wait(sensors.final_production, true, exit) {
            warn!(?exit, "Box did not reach final production from turntable 2");
        }
        self.tt2.execute(TurntableCommand::stop().turn(false))?;
        self.pause(seconds(self.config.return_s))
    }

    fn order(&self, color: BoxColor) -> Result<(), TurntableError> {
        if !self.ctx.is_running() {
            return Err(TurntableError::NotRunning);
        }
        self.tt2
            .execute(TurntableCommand::belt(BeltDirection::Forward).turn(false))?;
        self.ctx
            .write(self.ctx.map().actuators.central_conveyor, true);

        let discharge = self.ctx.map().sensors.tt2_discharge;
        let timeout = seconds(self.config.order_timeout_s);
        let deadline = Instant::now() + timeout;
        let delivered = self.wait_until(discharge, true, deadline)
            && self.wait_until(discharge, false, deadline);
        self.tt2.execute(TurntableCommand::stop())?;
        if delivered {
            info!(%color, "Order box delivered to central line");
        } else {
            warn!(%color, ?timeout, "Order box not seen leaving turntable 2");
        }
        Ok(())
    }

    fn wait(&self, addr: SensorAddr, expected: bool, timeout: Duration) -> bool {
        self.wait_until(addr, expected, Instant::now() + timeout)
    }

    /// Poll `addr` while the machine runs. `false` on deadline, stop or shutdown.
    fn wait_until(&self, addr: SensorAddr, expected: bool, deadline: Instant) -> bool {
        let poll = Duration::from_millis(self.config.poll_ms);
        loop {
            if self.ctx.read(addr) == expected {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || !self.ctx.is_running() || self.ctx.sleep(poll.min(deadline - now)) {
                return false;
            }
        }
    }

    fn pause(&self, dur: Duration) -> Result<(), TurntableError> {
        if self.ctx.sleep(dur) {
            return Err(TurntableError::ShuttingDown);
        }
        Ok(())
    }
}

/// FIFO dispatcher of turntable-2 work plus the stock/order routing decision.
pub struct Tt2Dispatcher {
    worker: QueueWorker<Tt2Job>,
    orders: Arc<OrderManager>,
    stock: Arc<StockQueue>,
}

impl Tt2Dispatcher {
    /// Create a stopped dispatcher.
    pub fn new(
        ctx: Arc<PlantContext>,
        config: Tt2Config,
        tt2: Arc<TurntableSequencer>,
        orders: Arc<OrderManager>,
        stock: Arc<StockQueue>,
    ) -> Self {
        let cycle = Tt2Cycle { ctx, config, tt2 };
        Self {
            worker: QueueWorker::new("tt2-dispatch", move |job| cycle.handle(job)),
            orders,
            stock,
        }
    }

    /// Decide where a box of `color` goes and queue the cycle.
    ///
    /// An order box is counted against its order here, when it is routed.
    pub fn route(&self, color: BoxColor) -> Tt2Job {
        let job = if self.orders.claim(color) {
            Tt2Job::Order(color)
        } else {
            self.stock.push(color);
            Tt2Job::NoOrder
        };
        info!(%color, %job, mode = %self.orders.mode(), "Box routed");
        self.worker.submit(job);
        job
    }

    /// Queue a job directly.
    pub fn submit(&self, job: Tt2Job) {
        self.worker.submit(job);
    }

    /// Queue a standard cycle for a box seen at the turntable-2 load point.
    ///
    /// Only in stock mode and only when nothing is queued; returns whether a
    /// job was queued.
    pub fn arm_if_idle(&self) -> bool {
        let mode = self.orders.mode();
        if mode != FulfillmentMode::Stock {
            debug!(%mode, "Turntable 2 not armed, order in progress");
            return false;
        }
        if self.worker.pending() > 0 {
            debug!("Turntable 2 not armed, queue not empty");
            return false;
        }
        info!("Turntable 2 armed from load sensor");
        self.worker.submit(Tt2Job::NoOrder);
        true
    }

    /// Start the consumer (idempotent).
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Spawn` if the thread could not be created.
    pub fn start(&self) -> Result<bool, ControlError> {
        self.worker.start()
    }

    /// Halt the consumer, waiting at most `timeout`.
    pub fn stop(&self, timeout: Duration) -> bool {
        self.worker.stop(timeout)
    }

    /// Jobs waiting in the queue.
    pub fn pending(&self) -> usize {
        self.worker.pending()
    }
}

impl ClassificationSink for Tt2Dispatcher {
    fn on_classified(&self, color: BoxColor) {
        self.route(color);
    }
}
