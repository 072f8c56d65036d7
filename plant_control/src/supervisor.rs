//! Operator buttons: start, stop, restart and emergency.
//!
//! Every button press goes through the machine state machine first; the
//! outputs follow the resulting state. Stop and emergency de-energize every
//! tracked actuator. An emergency remembers which turntable-1 belt coil was
//! on so a restart can put it back.

use crate::context::PlantContext;
use crate::dispatch::{ArrivalDispatcher, Tt2Dispatcher};
use crate::lines::LineController;
use crate::state::{MachineEvent, MachineState, TransitionResult};
use crate::turntable::TurntableSequencer;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turntable-1 belt coils captured at emergency time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BeltSnapshot {
    /// Forward coil was on.
    pub forward: bool,
    /// Backward coil was on.
    pub backward: bool,
}

/// Reacts to the operator buttons.
pub struct Supervisor {
    ctx: Arc<PlantContext>,
    lines: Arc<LineController>,
    tt1: Arc<TurntableSequencer>,
    tt2: Arc<TurntableSequencer>,
    arrival: Arc<ArrivalDispatcher>,
    tt2_queue: Arc<Tt2Dispatcher>,
    captured: Mutex<Option<BeltSnapshot>>,
}

impl Supervisor {
    /// Create a supervisor over the plant's subsystems.
    pub fn new(
        ctx: Arc<PlantContext>,
        lines: Arc<LineController>,
        tt1: Arc<TurntableSequencer>,
        tt2: Arc<TurntableSequencer>,
        arrival: Arc<ArrivalDispatcher>,
        tt2_queue: Arc<Tt2Dispatcher>,
    ) -> Self {
        Self {
            ctx,
            lines,
            tt1,
            tt2,
            arrival,
            tt2_queue,
            captured: Mutex::new(None),
        }
    }

    /// Start button.
    ///
    /// Returns whether the machine entered Running.
    pub fn on_start(&self) -> bool {
        if !self.transition(MachineEvent::Start) {
            return false;
        }
        self.start_workers();
        true
    }

    /// Stop button. Outputs are switched off even if the transition is rejected.
    pub fn on_stop(&self) {
        self.transition(MachineEvent::Stop);
        self.de_energize();
        self.update_lamps();
    }

    /// Restart button edge; acts only when the button reads pressed.
    pub fn on_restart(&self, pressed: bool) {
        if !pressed {
            return;
        }
        if !self.transition(MachineEvent::Restart) {
            return;
        }
        self.lines.all_on();
        if let Some(belts) = self.captured.lock().take() {
            let io = self.tt1.io();
            let _outputs = self.ctx.outputs();
            self.ctx.write(io.belt_forward, belts.forward);
            self.ctx.write(io.belt_backward, belts.backward);
            info!(forward = belts.forward, backward = belts.backward, "Turntable 1 belt restored");
        }
        self.start_workers();
    }

    /// Emergency input edge. The input reads `false` while engaged.
    pub fn on_emergency(&self, released: bool) {
        if released {
            self.transition(MachineEvent::EmergencyReleased);
            return;
        }
        let belts = self.capture_belts();
        if !self.transition(MachineEvent::EmergencyEngaged) {
            return;
        }
        *self.captured.lock() = Some(belts);
        warn!(forward = belts.forward, backward = belts.backward, "Emergency engaged");
        self.de_energize();
    }

    /// The belt state a restart would restore.
    pub fn captured_belts(&self) -> Option<BeltSnapshot> {
        *self.captured.lock()
    }

    /// Start both dispatcher workers (idempotent).
    pub fn start_workers(&self) {
        for (name, started) in [
            ("tt1-dispatch", self.arrival.start()),
            ("tt2-dispatch", self.tt2_queue.start()),
        ] {
            match started {
                Ok(true) => debug!(worker = name, "Dispatcher started"),
                Ok(false) => {}
                Err(e) => warn!(worker = name, error = %e, "Dispatcher not started"),
            }
        }
    }

    /// Mirror the machine state on the lamps.
    pub fn update_lamps(&self) {
        let state = self.ctx.machine_state();
        let map = &self.ctx.map().actuators;
        self.ctx.write(map.running_lamp, state == MachineState::Running);
        self.ctx.write(map.stop_lamp, state != MachineState::Running);
        self.ctx.write(map.emergency_lamp, state == MachineState::Emergency);
    }

    /// Apply `event`; on success update the lamps.
    fn transition(&self, event: MachineEvent) -> bool {
        match self.ctx.apply_event(event) {
            TransitionResult::Ok(_) => {
                self.update_lamps();
                true
            }
            TransitionResult::Rejected(reason) => {
                debug!(?event, reason, "Button ignored");
                false
            }
        }
    }

    fn capture_belts(&self) -> BeltSnapshot {
        let io = self.tt1.io();
        BeltSnapshot {
            forward: self.ctx.read_actuator(io.belt_forward),
            backward: self.ctx.read_actuator(io.belt_backward),
        }
    }

    /// Runs on the scan thread. Joining the belt watchers blocks for at most
    /// one turntable poll interval each.
    fn de_energize(&self) {
        self.tt1.halt();
        self.tt2.halt();
        self.lines.all_off();
    }
}
