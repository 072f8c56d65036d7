//! Exclusive command execution for one turntable.

use super::watcher::{Watch, WatchOutcome};
use super::{BeltDirection, TurntableCommand, TurntableIo};
use crate::config::TurntableConfig;
use crate::context::PlantContext;
use crate::error::TurntableError;
use parking_lot::{Condvar, Mutex, MutexGuard};
use plant::io::SensorAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single wait on the idle condition, so shutdown is noticed.
const WAIT_SLICE: Duration = Duration::from_millis(50);

struct ActiveWatcher {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TableState {
    owned: bool,
    watching: bool,
    belt: BeltDirection,
    /// Incremented every time a watcher starts.
    epoch: u64,
    watcher: Option<ActiveWatcher>,
    last_outcome: Option<WatchOutcome>,
}

/// Sequencer of one turntable.
///
/// Lock order: table state, then the context output lock.
pub struct TurntableSequencer {
    name: &'static str,
    io: TurntableIo,
    config: TurntableConfig,
    ctx: Arc<PlantContext>,
    table: Mutex<TableState>,
    changed: Condvar,
}

impl TurntableSequencer {
    /// Create an idle sequencer.
    pub fn new(
        name: &'static str,
        io: TurntableIo,
        config: TurntableConfig,
        ctx: Arc<PlantContext>,
    ) -> Self {
        Self {
            name,
            io,
            config,
            ctx,
            table: Mutex::new(TableState::default()),
            changed: Condvar::new(),
        }
    }

    /// Table name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wired actuators and sensors.
    pub fn io(&self) -> &TurntableIo {
        &self.io
    }

    /// Execute `cmd` on a short-lived worker thread.
    ///
    /// The caller blocks only for the guard wait; once the table is owned the
    /// command runs asynchronously and ownership is released when it has
    /// been applied. A belt watcher, if any, outlives the command.
    ///
    /// # Errors
    ///
    /// - `NotRunning` if the machine is not running
    /// - `Busy` if the table did not become idle within the guard timeout
    /// - `ShuttingDown` if shutdown was requested while waiting
    /// - `Spawn` if the worker thread could not be started
    pub fn set_table_async(self: &Arc<Self>, cmd: TurntableCommand) -> Result<(), TurntableError> {
        self.acquire(cmd)?;
        let me = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("{}-cmd", self.name))
            .spawn(move || {
                me.apply(cmd);
                me.release();
            });
        if let Err(e) = spawned {
            self.release();
            return Err(TurntableError::Spawn(e.to_string()));
        }
        Ok(())
    }

    /// Execute `cmd` on the calling thread.
    ///
    /// Same guard as [`set_table_async`](Self::set_table_async).
    pub fn execute(self: &Arc<Self>, cmd: TurntableCommand) -> Result<(), TurntableError> {
        self.acquire(cmd)?;
        self.apply(cmd);
        self.release();
        Ok(())
    }

    /// Cancel and join the belt watcher without touching the actuators.
    ///
    /// Used on stop and emergency, where the caller switches every output off.
    pub fn halt(&self) {
        let previous = self.take_watcher(&mut self.table.lock());
        if let Some(watcher) = previous {
            join_watcher(self.name, watcher);
        }
        let mut table = self.table.lock();
        table.belt = BeltDirection::Stop;
        self.changed.notify_all();
    }

    /// Whether no sequence owns the table and no watcher is alive.
    pub fn is_idle(&self) -> bool {
        let table = self.table.lock();
        !table.owned && !table.watching
    }

    /// Whether a belt watcher is alive.
    pub fn is_watching(&self) -> bool {
        self.table.lock().watching
    }

    /// Belt direction last applied (watchers reset it to `Stop`).
    pub fn belt(&self) -> BeltDirection {
        self.table.lock().belt
    }

    /// Rotation actuator read back from the I/O.
    pub fn turn(&self) -> bool {
        self.ctx.read_actuator(self.io.turn)
    }

    /// How the last completed watcher ended.
    pub fn last_watch_outcome(&self) -> Option<WatchOutcome> {
        self.table.lock().last_outcome
    }

    /// Number of watchers started so far.
    pub fn watcher_epoch(&self) -> u64 {
        self.table.lock().epoch
    }

    /// Wait until a watcher newer than `epoch` has started.
    pub fn wait_watcher_started_since(&self, epoch: u64, timeout: Duration) -> bool {
        self.wait_until(timeout, |t| t.epoch > epoch)
    }

    /// Wait until no watcher is alive.
    pub fn wait_watcher_idle(&self, timeout: Duration) -> bool {
        self.wait_until(timeout, |t| !t.watching)
    }

    // ─── Internals ──────────────────────────────────────────────────

    fn wait_until(&self, timeout: Duration, done: impl Fn(&TableState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut table = self.table.lock();
        loop {
            if done(&table) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || self.ctx.shutdown().is_triggered() {
                return false;
            }
            self.changed
                .wait_for(&mut table, WAIT_SLICE.min(deadline - now));
        }
    }

    /// Guard: wait for the table to become idle, then own it.
    fn acquire(&self, cmd: TurntableCommand) -> Result<(), TurntableError> {
        let start = Instant::now();
        let deadline = start + self.config.guard_timeout();
        let mut table = self.table.lock();
        loop {
            if self.ctx.shutdown().is_triggered() {
                return Err(TurntableError::ShuttingDown);
            }
            if !self.ctx.is_running() {
                debug!(table = self.name, %cmd, "Command ignored, machine not running");
                return Err(TurntableError::NotRunning);
            }
            if !table.owned && !table.watching {
                table.owned = true;
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                let waited = now - start;
                warn!(table = self.name, %cmd, ?waited, "Turntable busy, command rejected");
                return Err(TurntableError::Busy { waited });
            }
            self.changed
                .wait_for(&mut table, WAIT_SLICE.min(deadline - now));
        }
    }

    fn release(&self) {
        self.table.lock().owned = false;
        self.changed.notify_all();
    }

    /// Detach the current watcher, marking it cancelled so it will not
    /// switch the belt off itself.
    fn take_watcher(&self, table: &mut MutexGuard<'_, TableState>) -> Option<ActiveWatcher> {
        let watcher = table.watcher.take()?;
        watcher.cancel.store(true, Ordering::SeqCst);
        table.watching = false;
        Some(watcher)
    }

    fn apply(self: &Arc<Self>, cmd: TurntableCommand) {
        let previous = self.take_watcher(&mut self.table.lock());
        if let Some(watcher) = previous {
            join_watcher(self.name, watcher);
        }

        let mut table = self.table.lock();
        if !self.ctx.is_running() {
            return;
        }
        {
            let _outputs = self.ctx.outputs();
            if let Some(on) = cmd.turn {
                self.ctx.write(self.io.turn, on);
            }
            match cmd.belt {
                BeltDirection::Forward => {
                    self.ctx.write(self.io.belt_backward, false);
                    self.ctx.write(self.io.belt_forward, true);
                }
                BeltDirection::Backward => {
                    self.ctx.write(self.io.belt_forward, false);
                    self.ctx.write(self.io.belt_backward, true);
                }
                BeltDirection::Stop => {
                    self.ctx.write(self.io.belt_forward, false);
                    self.ctx.write(self.io.belt_backward, false);
                }
            }
        }
        table.belt = cmd.belt;
        info!(table = self.name, %cmd, "Turntable command applied");

        let Some(limit) = cmd.stop_limit else {
            return;
        };
        if cmd.belt == BeltDirection::Stop {
            return;
        }
        let Some(sensor) = self.io.limit(limit) else {
            warn!(table = self.name, %limit, "No limit sensor wired, belt runs unwatched");
            return;
        };
        self.start_watcher(&mut table, sensor, cmd);
    }

    fn start_watcher(
        self: &Arc<Self>,
        table: &mut MutexGuard<'_, TableState>,
        sensor: SensorAddr,
        cmd: TurntableCommand,
    ) {
        let cancel = Arc::new(AtomicBool::new(false));
        let started = Instant::now();
        let me = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let spawned = thread::Builder::new()
            .name(format!("{}-watch", self.name))
            .spawn(move || {
                let outcome = Watch {
                    ctx: &me.ctx,
                    config: &me.config,
                    cancel: &flag,
                    sensor,
                    timeout: cmd.timeout,
                    started,
                }
                .run();
                me.finish_watch(&flag, cmd.belt, outcome, started);
            });

        match spawned {
            Ok(handle) => {
                table.epoch += 1;
                table.watching = true;
                table.watcher = Some(ActiveWatcher { cancel, handle });
                self.changed.notify_all();
            }
            Err(e) => {
                warn!(table = self.name, error = %e, "Failed to spawn belt watcher, stopping belt");
                let _outputs = self.ctx.outputs();
                self.ctx.write(self.io.belt_forward, false);
                self.ctx.write(self.io.belt_backward, false);
                table.belt = BeltDirection::Stop;
            }
        }
    }

    /// Final belt-off of a watcher. Runs under the table lock and only if
    /// nobody cancelled the watcher, so the belt is switched off exactly once.
    fn finish_watch(&self, cancel: &AtomicBool, belt: BeltDirection, outcome: WatchOutcome, started: Instant) {
        let mut table = self.table.lock();
        if cancel.load(Ordering::SeqCst) {
            return;
        }
        if let Some(addr) = self.io.belt_actuator(belt) {
            let _outputs = self.ctx.outputs();
            self.ctx.write(addr, false);
        }
        table.belt = BeltDirection::Stop;
        table.watching = false;
        table.last_outcome = Some(outcome);
        self.changed.notify_all();

        let elapsed = started.elapsed();
        match outcome {
            WatchOutcome::Limit => {
                info!(table = self.name, %belt, ?elapsed, "Belt stopped by limit")
            }
            WatchOutcome::Timeout => {
                warn!(table = self.name, %belt, ?elapsed, "Belt stopped by timeout")
            }
            WatchOutcome::Interrupted => {
                info!(table = self.name, %belt, ?elapsed, "Belt stopped, watch interrupted")
            }
        }
    }
}

fn join_watcher(name: &str, watcher: ActiveWatcher) {
    if watcher.handle.join().is_err() {
        warn!(table = name, "Belt watcher panicked");
    }
}
