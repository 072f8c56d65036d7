//! Shared plant handle passed to every subsystem.
//!
//! Holds the I/O boundary, the address map, the machine state and the
//! output lock. Reads and writes here never fail: errors are logged and a
//! failed read counts as `false`, so sequences fall through to their
//! timeouts instead of unwinding.

use crate::lines::Line;
use crate::state::{MachineEvent, MachineState, MachineStateMachine, TransitionResult};
use crate::sync::ShutdownToken;
use parking_lot::{Mutex, MutexGuard, RwLock};
use plant::hal::IoBoundary;
use plant::io::{ActuatorAddr, IoMap, RegisterAddr, SensorAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Running flags guarded together with actuator writes.
#[derive(Debug, Default)]
pub struct OutputState {
    running: [bool; Line::COUNT],
}

impl OutputState {
    /// Whether `line` is flagged as running.
    pub fn is_running(&self, line: Line) -> bool {
        self.running[line.index()]
    }

    /// Update the running flag of `line`.
    pub fn set_running(&mut self, line: Line, running: bool) {
        self.running[line.index()] = running;
    }

    /// Clear every running flag.
    pub fn clear(&mut self) {
        self.running = [false; Line::COUNT];
    }
}

/// Handle shared by the scan thread and every worker.
pub struct PlantContext {
    io: Arc<dyn IoBoundary>,
    map: IoMap,
    machine: RwLock<MachineStateMachine>,
    shutdown: ShutdownToken,
    outputs: Mutex<OutputState>,
}

impl PlantContext {
    /// Create a context in the boot state (Emergency).
    pub fn new(io: Arc<dyn IoBoundary>, map: IoMap, shutdown: ShutdownToken) -> Self {
        Self {
            io,
            map,
            machine: RwLock::new(MachineStateMachine::new()),
            shutdown,
            outputs: Mutex::new(OutputState::default()),
        }
    }

    /// The I/O boundary.
    pub fn io(&self) -> &Arc<dyn IoBoundary> {
        &self.io
    }

    /// The address map.
    pub fn map(&self) -> &IoMap {
        &self.map
    }

    /// The process stop signal.
    pub fn shutdown(&self) -> &ShutdownToken {
        &self.shutdown
    }

    /// Current machine state.
    pub fn machine_state(&self) -> MachineState {
        self.machine.read().state()
    }

    /// Whether sequences may drive actuators.
    pub fn is_running(&self) -> bool {
        self.machine.read().is_running()
    }

    /// Apply an operator event to the machine state.
    pub fn apply_event(&self, event: MachineEvent) -> TransitionResult {
        let mut machine = self.machine.write();
        let from = machine.state();
        let result = machine.handle_event(event);
        if let TransitionResult::Ok(to) = result {
            info!(from = %from, to = %to, event = ?event, "Machine state changed");
        }
        result
    }

    /// Lock the output state. Lock order: turntable state, then outputs.
    pub fn outputs(&self) -> MutexGuard<'_, OutputState> {
        self.outputs.lock()
    }

    /// Read a sensor; failures read as `false`.
    pub fn read(&self, addr: SensorAddr) -> bool {
        match self.io.read_sensor(addr) {
            Ok(value) => value,
            Err(e) => {
                warn!("Sensor {addr} read failed: {e}");
                false
            }
        }
    }

    /// Read back an actuator; failures read as `false`.
    pub fn read_actuator(&self, addr: ActuatorAddr) -> bool {
        match self.io.read_actuator(addr) {
            Ok(value) => value,
            Err(e) => {
                warn!("Actuator {addr} read failed: {e}");
                false
            }
        }
    }

    /// Drive an actuator. Returns `false` if the write failed.
    pub fn write(&self, addr: ActuatorAddr, value: bool) -> bool {
        match self.io.set_actuator(addr, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Actuator {addr} <- {value} failed: {e}");
                false
            }
        }
    }

    /// Drive every actuator in `addrs`.
    pub fn write_all(&self, addrs: &[ActuatorAddr], value: bool) {
        for &addr in addrs {
            self.write(addr, value);
        }
    }

    /// Write a holding register. Returns `false` if the write failed.
    pub fn write_register(&self, addr: RegisterAddr, value: i16) -> bool {
        match self.io.write_register(addr, value) {
            Ok(()) => true,
            Err(e) => {
                warn!("Register {addr} <- {value} failed: {e}");
                false
            }
        }
    }

    /// Sleep unless shutdown is triggered. Returns `true` if interrupted.
    pub fn sleep(&self, dur: Duration) -> bool {
        self.shutdown.sleep(dur)
    }

    /// Poll `addr` until it reads `expected`.
    ///
    /// Returns `false` on timeout or shutdown.
    pub fn wait_sensor(
        &self,
        addr: SensorAddr,
        expected: bool,
        timeout: Duration,
        poll: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.read(addr) == expected {
                return true;
            }
            let now = Instant::now();
            if now >= deadline || self.sleep(poll.min(deadline - now)) {
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant::hal::SimulationConfig;
    use plant_hal::SimulatedIo;

    fn context() -> (Arc<SimulatedIo>, PlantContext) {
        let io = Arc::new(SimulatedIo::new(&SimulationConfig::default(), 16, 16, 2));
        let ctx = PlantContext::new(io.clone(), IoMap::default(), ShutdownToken::new());
        (io, ctx)
    }

    #[test]
    fn failed_read_counts_as_false() {
        let (_io, ctx) = context();
        assert!(!ctx.read(SensorAddr(90)));
        assert!(!ctx.write(ActuatorAddr(90), true));
        assert!(!ctx.write_register(RegisterAddr(5), 1));
    }

    #[test]
    fn wait_sensor_sees_scheduled_change() {
        let (io, ctx) = context();
        io.schedule_sensor(SensorAddr(3), true, Duration::from_millis(20));
        assert!(ctx.wait_sensor(SensorAddr(3), true, Duration::from_secs(1), Duration::from_millis(5)));
        assert!(!ctx.wait_sensor(SensorAddr(4), true, Duration::from_millis(20), Duration::from_millis(5)));
    }

    #[test]
    fn wait_sensor_aborts_on_shutdown() {
        let (_io, ctx) = context();
        ctx.shutdown().trigger();
        let start = Instant::now();
        assert!(!ctx.wait_sensor(SensorAddr(3), true, Duration::from_secs(5), Duration::from_millis(50)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn boots_in_emergency() {
        let (_io, ctx) = context();
        assert_eq!(ctx.machine_state(), MachineState::Emergency);
        assert!(!ctx.is_running());
        ctx.apply_event(MachineEvent::EmergencyReleased);
        ctx.apply_event(MachineEvent::Start);
        assert!(ctx.is_running());
    }
}
