//! Line run/stop primitives.

use super::Line;
use crate::context::PlantContext;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Run/stop of the conveyor lines.
///
/// Running flags and actuator writes share the context output lock, so a
/// stop never interleaves with a run on the same conveyors.
pub struct LineController {
    ctx: Arc<PlantContext>,
}

impl LineController {
    /// Create a controller.
    pub fn new(ctx: Arc<PlantContext>) -> Self {
        Self { ctx }
    }

    /// Energize `line` and its feed conveyors.
    ///
    /// No-op unless the machine is running or if the line already runs.
    /// Returns whether the line was started by this call.
    pub fn run(&self, line: Line) -> bool {
        if !self.ctx.is_running() {
            debug!(%line, "Line run ignored, machine not running");
            return false;
        }
        let map = &self.ctx.map().actuators;
        let mut outputs = self.ctx.outputs();
        if outputs.is_running(line) {
            return false;
        }
        outputs.set_running(line, true);
        self.ctx.write_all(line.conveyors(map), true);
        self.ctx.write_all(line.feed(map), true);
        info!(%line, "Line running");
        true
    }

    /// De-energize `line`, whatever its running flag says.
    pub fn stop(&self, line: Line) {
        let map = &self.ctx.map().actuators;
        let mut outputs = self.ctx.outputs();
        self.ctx.write_all(line.conveyors(map), false);
        outputs.set_running(line, false);
        info!(%line, "Line stopped");
    }

    /// Whether `line` is flagged as running.
    pub fn is_running(&self, line: Line) -> bool {
        self.ctx.outputs().is_running(line)
    }

    /// [`run`](Self::run) on a short-lived thread.
    pub fn run_async(self: &Arc<Self>, line: Line) {
        let me = Arc::clone(self);
        self.spawn(format!("line-run-{line}"), line, move || {
            me.run(line);
        });
    }

    /// [`stop`](Self::stop) on a short-lived thread.
    pub fn stop_async(self: &Arc<Self>, line: Line) {
        let me = Arc::clone(self);
        self.spawn(format!("line-stop-{line}"), line, move || me.stop(line));
    }

    /// Clear every running flag and switch every tracked actuator off.
    pub fn all_off(&self) {
        let mut outputs = self.ctx.outputs();
        self.ctx.write_all(&self.ctx.map().actuators.tracked(), false);
        outputs.clear();
        info!("All tracked actuators off");
    }

    /// Energize every conveyor and flag every line as running.
    pub fn all_on(&self) {
        let mut outputs = self.ctx.outputs();
        self.ctx.write_all(&self.ctx.map().actuators.conveyors(), true);
        for line in Line::ALL {
            outputs.set_running(line, true);
        }
        info!("All conveyors on");
    }

    fn spawn(&self, name: String, line: Line, job: impl FnOnce() + Send + 'static) {
        if let Err(e) = thread::Builder::new().name(name).spawn(job) {
            warn!(%line, error = %e, "Failed to spawn line worker");
        }
    }
}
