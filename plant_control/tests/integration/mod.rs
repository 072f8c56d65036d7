//! Shared rig: a plant over `SimulatedIo` with shortened timings and a
//! scan thread running at 5 ms.

mod arrival_flow;
mod emergency;
mod order_routing;
mod shuttle;
mod startup;
mod turntable_guard;

use plant::hal::{RegisterPulse, SimulationConfig};
use plant::io::{RegisterAddr, SensorAddr};
use plant::store::{MemoryOrderStore, OrderConfig};
use plant_control::state::MachineState;
use plant_control::sync::ShutdownToken;
use plant_control::{Plant, PlantConfig};
use plant_hal::SimulatedIo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ── Helpers ─────────────────────────────────────────────────────────

pub const EMERGENCY: SensorAddr = SensorAddr(9);
pub const START: SensorAddr = SensorAddr(24);
pub const RESTART: SensorAddr = SensorAddr(25);
pub const STOP: SensorAddr = SensorAddr(26);

/// Plant configuration with every timing cut down to test scale.
pub fn fast_config() -> PlantConfig {
    let mut config = PlantConfig::default();
    config.scan.period_ms = 5;

    config.turntable.guard_timeout_s = 2.0;
    config.turntable.grace_s = 0.02;
    config.turntable.poll_ms = 5;
    config.turntable.min_on_s = 0.05;

    for policy in [
        &mut config.arrival.blue,
        &mut config.arrival.green,
        &mut config.arrival.other,
    ] {
        policy.belt_timeout_s = 0.5;
        policy.feed_delay_s = 0.05;
        policy.return_s = 0.05;
        policy.exit_timeout_s = 0.5;
    }
    config.arrival.watcher_start_s = 0.5;
    config.arrival.watcher_finish_s = 2.0;
    config.arrival.clear_margin_s = 0.1;
    config.arrival.settle_ms = 5;

    config.classification.window_ms = 60;
    config.classification.align_ms = 5;
    config.classification.sample_ms = 5;
    config.classification.pause_ms = 5;

    config.tt2.turn_s = 0.02;
    config.tt2.return_s = 0.02;
    config.tt2.entry_timeout_s = 0.3;
    config.tt2.exit_timeout_s = 0.3;
    config.tt2.order_timeout_s = 0.3;
    config.tt2.poll_ms = 5;

    config.shuttle.first_move_settle_s = 0.01;
    config.shuttle.move_settle_s = 0.01;
    config.shuttle.fork_s = 0.0;
    config.shuttle.retract_s = 0.0;
    config.shuttle.not_in_store_s = 0.01;
    config.shuttle.move_timeout_s = 0.5;
    config.shuttle.poll_ms = 2;

    config.simulation = SimulationConfig {
        register_pulses: vec![RegisterPulse {
            register: RegisterAddr(0),
            busy_sensor: SensorAddr(8),
            busy_s: 0.02,
        }],
        ..SimulationConfig::default()
    };
    config
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while !cond() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
    true
}

/// A plant with a live scan thread.
pub struct Rig {
    pub io: Arc<SimulatedIo>,
    pub store: Arc<MemoryOrderStore>,
    pub plant: Plant,
    running: Arc<AtomicBool>,
    scan: Option<JoinHandle<()>>,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    pub fn with_config(config: PlantConfig) -> Self {
        let io = Arc::new(SimulatedIo::new(&config.simulation, 128, 128, 2));
        let store = Arc::new(MemoryOrderStore::new(OrderConfig::default()));
        let plant = Plant::build(&config, io.clone(), store.clone(), ShutdownToken::new());

        let mut scan = plant.scan_loop(&config);
        let running = scan.running_flag();
        let mut events = plant.event_processor();
        let handle = thread::Builder::new()
            .name("test-scan".to_string())
            .spawn(move || {
                let _ = scan.run(&mut events);
            })
            .unwrap();

        Self {
            io,
            store,
            plant,
            running,
            scan: Some(handle),
        }
    }

    pub fn state(&self) -> MachineState {
        self.plant.ctx().machine_state()
    }

    /// Hold `addr` high for a few scans, then release it.
    pub fn press(&self, addr: SensorAddr) {
        self.io.set_sensor(addr, true);
        thread::sleep(Duration::from_millis(20));
        self.io.set_sensor(addr, false);
        thread::sleep(Duration::from_millis(20));
    }

    /// Release the emergency input and press Start.
    pub fn bring_up(&self) {
        thread::sleep(Duration::from_millis(20));
        self.io.set_sensor(EMERGENCY, true);
        assert!(wait_for(Duration::from_secs(1), || self.state() == MachineState::Idle));
        self.press(START);
        assert!(wait_for(Duration::from_secs(1), || self.state() == MachineState::Running));
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.scan.take() {
            let _ = handle.join();
        }
        self.plant.shutdown();
    }
}
