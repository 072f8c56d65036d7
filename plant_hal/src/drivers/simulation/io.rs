//! In-memory I/O map with linked reactions.
//!
//! The `SimulatedIo` manages:
//! - Sensor, actuator and register banks sized from the address map
//! - Linked sensor reactions (actuator edge triggers a delayed sensor change)
//! - Register busy pulses (register write holds a sensor high for a while)
//! - A write log per actuator and register for inspection in tests
//!
//! Pending changes are applied lazily: every access first drains the
//! changes whose trigger time has passed, so no background thread is needed.

use parking_lot::Mutex;
use plant::config::seconds;
use plant::hal::{DriverSettings, HalError, IoBoundary, LinkedSensor, RegisterPulse, SimulationConfig};
use plant::io::{ActuatorAddr, RegisterAddr, SensorAddr};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Minimum coil bank size, so spare addresses stay writable.
const MIN_BANK: usize = 128;

/// Minimum register bank size.
const MIN_REGISTERS: usize = 16;

/// Sensor change queued by a linked reaction or a register pulse.
#[derive(Debug, Clone)]
struct PendingChange {
    /// When this change should be applied
    trigger_time: Instant,
    /// Sensor index
    sensor: usize,
    /// New state for the sensor
    value: bool,
}

#[derive(Debug)]
struct SimState {
    sensors: Vec<bool>,
    actuators: Vec<bool>,
    registers: Vec<i16>,
    /// Linked reactions keyed by actuator index
    links: HashMap<usize, Vec<LinkedSensor>>,
    /// Busy pulses keyed by register index
    pulses: HashMap<usize, Vec<RegisterPulse>>,
    /// Pending sensor changes, ordered by trigger time
    pending: VecDeque<PendingChange>,
    actuator_log: HashMap<usize, Vec<bool>>,
    register_log: HashMap<usize, Vec<i16>>,
}

impl SimState {
    fn apply_pending(&mut self, now: Instant) {
        while let Some(change) = self.pending.pop_front() {
            if change.trigger_time > now {
                self.pending.push_front(change);
                break;
            }
            trace!("sim: S{} -> {}", change.sensor, change.value);
            self.sensors[change.sensor] = change.value;
        }
    }

    fn schedule(&mut self, trigger_time: Instant, sensor: usize, value: bool) {
        let pos = self.pending.partition_point(|p| p.trigger_time <= trigger_time);
        self.pending.insert(
            pos,
            PendingChange {
                trigger_time,
                sensor,
                value,
            },
        );
    }
}

fn check(space: &'static str, addr: u16, size: usize) -> Result<usize, HalError> {
    let idx = addr as usize;
    if idx < size {
        Ok(idx)
    } else {
        Err(HalError::AddressOutOfRange { space, addr, size })
    }
}

/// Simulated I/O boundary.
#[derive(Debug)]
pub struct SimulatedIo {
    state: Mutex<SimState>,
}

impl SimulatedIo {
    /// Create a simulator with the given bank sizes.
    ///
    /// Banks grow as needed to cover every address named in `config`.
    pub fn new(
        config: &SimulationConfig,
        sensor_len: usize,
        actuator_len: usize,
        register_len: usize,
    ) -> Self {
        let sensor_len = config
            .initial_high
            .iter()
            .copied()
            .chain(config.links.iter().map(|l| l.sensor))
            .chain(config.register_pulses.iter().map(|p| p.busy_sensor))
            .map(|s| s.index() + 1)
            .fold(sensor_len, usize::max);
        let actuator_len = config
            .links
            .iter()
            .map(|l| l.actuator.index() + 1)
            .fold(actuator_len, usize::max);
        let register_len = config
            .register_pulses
            .iter()
            .map(|p| p.register.index() + 1)
            .fold(register_len, usize::max);

        let mut sensors = vec![false; sensor_len];
        for addr in &config.initial_high {
            sensors[addr.index()] = true;
        }

        let mut links: HashMap<usize, Vec<LinkedSensor>> = HashMap::new();
        for link in &config.links {
            links.entry(link.actuator.index()).or_default().push(link.clone());
        }
        let mut pulses: HashMap<usize, Vec<RegisterPulse>> = HashMap::new();
        for pulse in &config.register_pulses {
            pulses.entry(pulse.register.index()).or_default().push(pulse.clone());
        }

        debug!(
            "SimulatedIo initialized: {} sensors, {} actuators, {} registers, {} links",
            sensor_len,
            actuator_len,
            register_len,
            config.links.len()
        );

        Self {
            state: Mutex::new(SimState {
                sensors,
                actuators: vec![false; actuator_len],
                registers: vec![0; register_len],
                links,
                pulses,
                pending: VecDeque::new(),
                actuator_log: HashMap::new(),
                register_log: HashMap::new(),
            }),
        }
    }

    /// Create a simulator sized for the driver settings' address map.
    pub fn from_settings(settings: &DriverSettings<'_>) -> Self {
        let sensor_len = settings
            .scan
            .snapshot_len
            .max(settings.io.required_snapshot_len())
            .max(MIN_BANK);
        let actuator_len = (settings.io.actuators.max_address() as usize + 1).max(MIN_BANK);
        let register_len =
            (settings.io.registers.shuttle_target.index() + 1).max(MIN_REGISTERS);
        Self::new(settings.simulation, sensor_len, actuator_len, register_len)
    }

    /// Force a sensor value, as an operator or a box would.
    pub fn set_sensor(&self, addr: SensorAddr, value: bool) {
        let mut state = self.state.lock();
        state.apply_pending(Instant::now());
        match check("sensor", addr.raw(), state.sensors.len()) {
            Ok(idx) => state.sensors[idx] = value,
            Err(e) => warn!("sim: {e}"),
        }
    }

    /// Change a sensor after `after` has elapsed.
    pub fn schedule_sensor(&self, addr: SensorAddr, value: bool, after: Duration) {
        let mut state = self.state.lock();
        match check("sensor", addr.raw(), state.sensors.len()) {
            Ok(idx) => state.schedule(Instant::now() + after, idx, value),
            Err(e) => warn!("sim: {e}"),
        }
    }

    /// Every value written to `addr`, oldest first.
    pub fn actuator_log(&self, addr: ActuatorAddr) -> Vec<bool> {
        self.state
            .lock()
            .actuator_log
            .get(&addr.index())
            .cloned()
            .unwrap_or_default()
    }

    /// Every value written to register `addr`, oldest first.
    pub fn register_log(&self, addr: RegisterAddr) -> Vec<i16> {
        self.state
            .lock()
            .register_log
            .get(&addr.index())
            .cloned()
            .unwrap_or_default()
    }

    /// Forget the write logs.
    pub fn clear_logs(&self) {
        let mut state = self.state.lock();
        state.actuator_log.clear();
        state.register_log.clear();
    }
}

impl IoBoundary for SimulatedIo {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_sensor(&self, addr: SensorAddr) -> Result<bool, HalError> {
        let mut state = self.state.lock();
        state.apply_pending(Instant::now());
        let idx = check("sensor", addr.raw(), state.sensors.len())?;
        Ok(state.sensors[idx])
    }

    fn read_actuator(&self, addr: ActuatorAddr) -> Result<bool, HalError> {
        let state = self.state.lock();
        let idx = check("actuator", addr.raw(), state.actuators.len())?;
        Ok(state.actuators[idx])
    }

    fn set_actuator(&self, addr: ActuatorAddr, value: bool) -> Result<(), HalError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.apply_pending(now);
        let idx = check("actuator", addr.raw(), state.actuators.len())?;

        let previous = state.actuators[idx];
        state.actuators[idx] = value;
        state.actuator_log.entry(idx).or_default().push(value);

        // Reactions fire on edges only
        if previous != value {
            let reactions: Vec<(Instant, usize, bool)> = state
                .links
                .get(&idx)
                .map(|links| {
                    links
                        .iter()
                        .filter(|l| l.trigger == value)
                        .map(|l| (now + seconds(l.delay_s), l.sensor.index(), l.result))
                        .collect()
                })
                .unwrap_or_default();
            for (at, sensor, result) in reactions {
                if at <= now {
                    state.sensors[sensor] = result;
                } else {
                    state.schedule(at, sensor, result);
                }
            }
        }
        Ok(())
    }

    fn read_register(&self, addr: RegisterAddr) -> Result<i16, HalError> {
        let state = self.state.lock();
        let idx = check("register", addr.raw(), state.registers.len())?;
        Ok(state.registers[idx])
    }

    fn write_register(&self, addr: RegisterAddr, value: i16) -> Result<(), HalError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.apply_pending(now);
        let idx = check("register", addr.raw(), state.registers.len())?;
        state.registers[idx] = value;
        state.register_log.entry(idx).or_default().push(value);

        let pulses: Vec<(usize, Duration)> = state
            .pulses
            .get(&idx)
            .map(|p| {
                p.iter()
                    .map(|p| (p.busy_sensor.index(), seconds(p.busy_s)))
                    .collect()
            })
            .unwrap_or_default();
        for (sensor, busy) in pulses {
            // A new move restarts the busy window
            state.pending.retain(|c| c.sensor != sensor);
            state.sensors[sensor] = true;
            state.schedule(now + busy, sensor, false);
        }
        Ok(())
    }

    fn snapshot(&self, len: usize) -> Result<Vec<bool>, HalError> {
        let mut state = self.state.lock();
        state.apply_pending(Instant::now());
        if len > state.sensors.len() {
            return Err(HalError::AddressOutOfRange {
                space: "sensor",
                addr: u16::try_from(len - 1).unwrap_or(u16::MAX),
                size: state.sensors.len(),
            });
        }
        Ok(state.sensors[..len].to_vec())
    }
}
