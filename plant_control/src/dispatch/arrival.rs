//! Turntable-1 job queue.
//!
//! ```text
//!  arrival edge ──► Arrival{color, origin} ─┐
//!  hall sensor  ──► Classify ───────────────┤  FIFO, one consumer
//!                                           ▼
//!  Queued ─► TableAcquired ─► FeedReleased ─► Draining ─► Idle
//!                 │
//!                 └─► post-limit phase (own thread):
//!                     watcher start ─► watcher end ─► return to center
//!                     ─► discharge until final production ─► production on
//! ```
//!
//! The busy flag is held from the start of an arrival job until its belt
//! watcher has cleared. The post-limit phase runs without it; its table
//! commands go through the turntable guard like any other.

use super::classify::{ClassificationSink, VisionClassifier};
use super::worker::QueueWorker;
use crate::config::{ArrivalConfig, ArrivalPolicy};
use crate::context::PlantContext;
use crate::edge::InhibitFlag;
use crate::error::ControlError;
use crate::lines::{Line, LineController};
use crate::sync::BusyFlag;
use crate::turntable::{TurntableCommand, TurntableSequencer};
use parking_lot::Mutex;
use plant::color::BoxColor;
use plant::config::seconds;
use plant::io::SensorAddr;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL: Duration = Duration::from_millis(20);

/// Job on the turntable-1 queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalJob {
    /// A box reached the end of an infeed line.
    Arrival {
        /// Line color, from the arrival sensor.
        color: BoxColor,
        /// Arrival sensor that fired.
        origin: SensorAddr,
    },
    /// A box is under the vision sensors.
    Classify,
}

/// Progress of the current arrival job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrivalPhase {
    /// Waiting for the turntable.
    Queued,
    /// Turntable command issued.
    TableAcquired,
    /// Originating line running again.
    FeedReleased,
    /// Waiting for the belt watcher to clear.
    Draining,
    /// No arrival job in progress.
    #[default]
    Idle,
}

impl fmt::Display for ArrivalPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArrivalPhase::Queued => "queued",
            ArrivalPhase::TableAcquired => "table-acquired",
            ArrivalPhase::FeedReleased => "feed-released",
            ArrivalPhase::Draining => "draining",
            ArrivalPhase::Idle => "idle",
        })
    }
}

/// Turntable command for a box arriving under `policy`.
fn arrival_command(policy: &ArrivalPolicy) -> TurntableCommand {
    let cmd = TurntableCommand::belt(policy.belt).with_turn(policy.turn);
    match policy.stop_limit {
        Some(limit) => cmd.stop_at(limit, seconds(policy.belt_timeout_s)),
        None => cmd,
    }
}

struct ArrivalSequence {
    ctx: Arc<PlantContext>,
    config: ArrivalConfig,
    tt1: Arc<TurntableSequencer>,
    lines: Arc<LineController>,
    classifier: VisionClassifier,
    sink: Arc<dyn ClassificationSink>,
    inhibit: InhibitFlag,
    busy: BusyFlag,
    phase: Mutex<ArrivalPhase>,
}

impl ArrivalSequence {
    fn handle(self: &Arc<Self>, job: ArrivalJob) {
        match job {
            ArrivalJob::Arrival { color, origin } => self.arrival(color, origin),
            ArrivalJob::Classify => self.classify(),
        }
    }

    fn set_phase(&self, phase: ArrivalPhase) {
        *self.phase.lock() = phase;
        debug!(%phase, "Arrival phase");
    }

    fn arrival(self: &Arc<Self>, color: BoxColor, origin: SensorAddr) {
        self.set_phase(ArrivalPhase::Queued);
        self.run_arrival(color, origin);
        self.set_phase(ArrivalPhase::Idle);
    }

    fn run_arrival(self: &Arc<Self>, color: BoxColor, origin: SensorAddr) {
        let Some(_guard) = self.busy.acquire(self.ctx.shutdown(), POLL) else {
            return;
        };
        if !self.ctx.is_running() {
            debug!(%color, "Arrival dropped, machine not running");
            return;
        }

        let policy = self.config.policy(color);
        let cmd = arrival_command(policy);
        let epoch = self.tt1.watcher_epoch();
        if let Err(e) = self.tt1.set_table_async(cmd) {
            warn!(%color, %cmd, error = %e, "Turntable 1 rejected arrival");
            return;
        }
        self.set_phase(ArrivalPhase::TableAcquired);
        info!(%color, origin = %origin, %cmd, "Box taken onto turntable 1");
        self.spawn_post_limit(epoch, policy.clone());

        if !self.hold_while_running(seconds(policy.feed_delay_s)) {
            return;
        }
        self.lines.run(Line::from_color(color));
        self.set_phase(ArrivalPhase::FeedReleased);

        self.set_phase(ArrivalPhase::Draining);
        let clear = seconds(policy.belt_timeout_s + self.config.clear_margin_s);
        if !self.tt1.wait_watcher_idle(clear) {
            warn!(%color, ?clear, "Belt watcher still active, continuing");
        }
        self.ctx.sleep(Duration::from_millis(self.config.settle_ms));
    }

    /// Sleep in poll slices. Returns `false` if the machine left Running or
    /// shutdown was requested.
    fn hold_while_running(&self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        loop {
            if !self.ctx.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            if self.ctx.sleep(POLL.min(deadline - now)) {
                return false;
            }
        }
    }

    fn spawn_post_limit(self: &Arc<Self>, epoch: u64, policy: ArrivalPolicy) {
        let me = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("tt1-post-limit".to_string())
            .spawn(move || me.post_limit(epoch, &policy));
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn post-limit phase, box stays on turntable 1");
        }
    }

    /// Return the table and discharge the box towards production.
    fn post_limit(&self, epoch: u64, policy: &ArrivalPolicy) {
        let config = &self.config;
        if !self
            .tt1
            .wait_watcher_started_since(epoch, seconds(config.watcher_start_s))
        {
            warn!("Belt watcher never started, post-limit phase skipped");
            return;
        }
        if !self.tt1.wait_watcher_idle(seconds(config.watcher_finish_s)) {
            warn!("Belt watcher did not finish in time");
        }

        if let Err(e) = self.tt1.execute(TurntableCommand::stop().turn(false)) {
            debug!(error = %e, "Post-limit phase aborted before return");
            return;
        }
        if self.ctx.sleep(seconds(policy.return_s)) {
            return;
        }

        if let Err(e) = self.tt1.execute(TurntableCommand::belt(config.discharge_belt)) {
            debug!(error = %e, "Post-limit phase aborted before discharge");
            return;
        }
        let actuators = &self.ctx.map().actuators;
        self.ctx.write(actuators.vision_conveyor, true);
        self.ctx.write(actuators.stock_conveyor, true);

        let exit = seconds(policy.exit_timeout_s);
        let sensor = self.ctx.map().sensors.final_production;
        if !self.ctx.wait_sensor(sensor, true, exit, POLL) {
            warn!(?exit, "Box did not reach final production");
        }

        if let Err(e) = self.tt1.execute(TurntableCommand::stop()) {
            warn!(error = %e, "Turntable 1 belt not stopped after discharge");
        }
        self.lines.run(Line::Production);
        info!("Turntable 1 released");
    }

    fn classify(&self) {
        let conveyor = self.ctx.map().actuators.vision_conveyor;
        self.ctx.write(conveyor, false);
        self.ctx
            .sleep(Duration::from_millis(self.classifier.config().pause_ms));

        if let Some(result) = self.classifier.classify() {
            self.sink.on_classified(result.color);
        }

        if self.ctx.is_running() {
            self.ctx.write(conveyor, true);
        }
        self.inhibit.clear();
    }
}

/// FIFO dispatcher of turntable-1 work.
pub struct ArrivalDispatcher {
    sequence: Arc<ArrivalSequence>,
    worker: QueueWorker<ArrivalJob>,
}

impl ArrivalDispatcher {
    /// Create a stopped dispatcher.
    ///
    /// `inhibit` is the flag suppressing the hall sensor registration; it is
    /// set when a classification is queued and cleared when it completes.
    pub fn new(
        ctx: Arc<PlantContext>,
        config: ArrivalConfig,
        tt1: Arc<TurntableSequencer>,
        lines: Arc<LineController>,
        classifier: VisionClassifier,
        sink: Arc<dyn ClassificationSink>,
        inhibit: InhibitFlag,
    ) -> Self {
        let sequence = Arc::new(ArrivalSequence {
            ctx,
            config,
            tt1,
            lines,
            classifier,
            sink,
            inhibit,
            busy: BusyFlag::new(),
            phase: Mutex::new(ArrivalPhase::Idle),
        });
        let handler = Arc::clone(&sequence);
        let worker = QueueWorker::new("tt1-dispatch", move |job| handler.handle(job));
        Self { sequence, worker }
    }

    /// Queue a box that reached the end of the `color` line.
    pub fn enqueue_arrival(&self, color: BoxColor, origin: SensorAddr) {
        debug!(%color, origin = %origin, "Arrival queued");
        self.worker.submit(ArrivalJob::Arrival { color, origin });
    }

    /// Queue a classification window.
    ///
    /// Returns `false`, queuing nothing, if one is already queued or running.
    pub fn enqueue_classification(&self) -> bool {
        if self.sequence.inhibit.arm() {
            debug!("Classification already pending");
            return false;
        }
        self.worker.submit(ArrivalJob::Classify);
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

    /// Whether an arrival job holds turntable 1 (until its watcher clears).
    pub fn is_busy(&self) -> bool {
        self.sequence.busy.is_busy()
    }

    /// Progress of the current arrival job.
    pub fn phase(&self) -> ArrivalPhase {
        *self.sequence.phase.lock()
    }
}
