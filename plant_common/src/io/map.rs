//! Plant address map.
//!
//! Deserialized from the `[io.sensors]`, `[io.actuators]` and
//! `[io.registers]` tables. Every field defaults to the address wired in
//! the sorting cell, so an empty `[io]` section yields the standard map.
//!
//! ```toml
//! [io.sensors]
//! hall = 90
//!
//! [io.actuators]
//! green_line = [78, 79, 80, 81]
//! ```

use super::addr::{ActuatorAddr, RegisterAddr, SensorAddr};
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const fn s(addr: u16) -> SensorAddr {
    SensorAddr(addr)
}

const fn a(addr: u16) -> ActuatorAddr {
    ActuatorAddr(addr)
}

fn group(addrs: &[u16]) -> Vec<ActuatorAddr> {
    addrs.iter().copied().map(ActuatorAddr).collect()
}

// ─── Sensors ────────────────────────────────────────────────────────

/// Boolean inputs: operator buttons, presence sensors, limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorMap {
    /// Emergency button (reads `false` while engaged).
    pub emergency: SensorAddr,
    /// Start button.
    pub start: SensorAddr,
    /// Stop button.
    pub stop: SensorAddr,
    /// Restart button.
    pub restart: SensorAddr,
    /// Create-order button.
    pub create_order: SensorAddr,
    /// Retrieve-from-storage button.
    pub retrieve_request: SensorAddr,

    /// Blue infeed presence sensor (normally closed).
    pub infeed_blue: SensorAddr,
    /// Green infeed presence sensor (normally closed).
    pub infeed_green: SensorAddr,
    /// Other/empty infeed presence sensor (normally closed).
    pub infeed_other: SensorAddr,
    /// Blue box arrived in front of turntable 1.
    pub arrival_blue: SensorAddr,
    /// Green box arrived in front of turntable 1.
    pub arrival_green: SensorAddr,
    /// Other box arrived in front of turntable 1.
    pub arrival_other: SensorAddr,

    /// Turntable 1 front limit.
    pub tt1_front_limit: SensorAddr,
    /// Turntable 1 back limit.
    pub tt1_back_limit: SensorAddr,
    /// Turntable 2 front limit, if fitted.
    pub tt2_front_limit: Option<SensorAddr>,
    /// Turntable 2 back limit, if fitted.
    pub tt2_back_limit: Option<SensorAddr>,

    /// End of the production conveyor.
    pub final_production: SensorAddr,
    /// Vision station, blue detector.
    pub vision_blue: SensorAddr,
    /// Vision station, green detector.
    pub vision_green: SensorAddr,
    /// Vision trigger (box under the camera).
    pub hall: SensorAddr,
    /// Turntable 2 load position.
    pub tt2_load: SensorAddr,
    /// Turntable 2 discharge position.
    pub tt2_discharge: SensorAddr,

    /// Box waiting at the generic storage pickup.
    pub storage_warehouse: SensorAddr,
    /// Box waiting at the client pickup.
    pub client_warehouse: SensorAddr,
    /// Shuttle is travelling.
    pub shuttle_moving: SensorAddr,
}

impl Default for SensorMap {
    fn default() -> Self {
        Self {
            emergency: s(9),
            start: s(24),
            stop: s(26),
            restart: s(25),
            create_order: s(28),
            retrieve_request: s(29),
            infeed_blue: s(80),
            infeed_green: s(77),
            infeed_other: s(83),
            arrival_blue: s(81),
            arrival_green: s(78),
            arrival_other: s(84),
            tt1_front_limit: s(95),
            tt1_back_limit: s(94),
            tt2_front_limit: None,
            tt2_back_limit: None,
            final_production: s(86),
            vision_blue: s(88),
            vision_green: s(89),
            hall: s(90),
            tt2_load: s(96),
            tt2_discharge: s(97),
            storage_warehouse: s(13),
            client_warehouse: s(14),
            shuttle_moving: s(8),
        }
    }
}

impl SensorMap {
    /// Every configured sensor address with its field name.
    pub fn entries(&self) -> Vec<(&'static str, SensorAddr)> {
        let mut out = vec![
            ("emergency", self.emergency),
            ("start", self.start),
            ("stop", self.stop),
            ("restart", self.restart),
            ("create_order", self.create_order),
            ("retrieve_request", self.retrieve_request),
            ("infeed_blue", self.infeed_blue),
            ("infeed_green", self.infeed_green),
            ("infeed_other", self.infeed_other),
            ("arrival_blue", self.arrival_blue),
            ("arrival_green", self.arrival_green),
            ("arrival_other", self.arrival_other),
            ("tt1_front_limit", self.tt1_front_limit),
            ("tt1_back_limit", self.tt1_back_limit),
            ("final_production", self.final_production),
            ("vision_blue", self.vision_blue),
            ("vision_green", self.vision_green),
            ("hall", self.hall),
            ("tt2_load", self.tt2_load),
            ("tt2_discharge", self.tt2_discharge),
            ("storage_warehouse", self.storage_warehouse),
            ("client_warehouse", self.client_warehouse),
            ("shuttle_moving", self.shuttle_moving),
        ];
        if let Some(addr) = self.tt2_front_limit {
            out.push(("tt2_front_limit", addr));
        }
        if let Some(addr) = self.tt2_back_limit {
            out.push(("tt2_back_limit", addr));
        }
        out
    }
}

// ─── Actuators ──────────────────────────────────────────────────────

/// Boolean outputs: lamps, conveyors, turntables, shuttle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorMap {
    /// "Running" lamp.
    pub running_lamp: ActuatorAddr,
    /// "Stopped" lamp.
    pub stop_lamp: ActuatorAddr,
    /// "Emergency" lamp.
    pub emergency_lamp: ActuatorAddr,

    /// Conveyor towards the warehouse storage pickup.
    pub stock_conveyor: ActuatorAddr,
    /// Central (order delivery) conveyor.
    pub central_conveyor: ActuatorAddr,

    /// Blue infeed conveyors, switched off on stop.
    pub blue_line: Vec<ActuatorAddr>,
    /// Conveyors energized with the blue line but left running on stop.
    pub blue_line_feed: Vec<ActuatorAddr>,
    /// Green infeed conveyors.
    pub green_line: Vec<ActuatorAddr>,
    /// Conveyors energized with the green line but left running on stop.
    pub green_line_feed: Vec<ActuatorAddr>,
    /// Other/empty infeed conveyors.
    pub other_line: Vec<ActuatorAddr>,
    /// Conveyors energized with the other line but left running on stop.
    pub other_line_feed: Vec<ActuatorAddr>,
    /// Production conveyors, switched off on stop.
    pub production_line: Vec<ActuatorAddr>,
    /// Production conveyors left running on stop (vision station belt).
    pub production_line_feed: Vec<ActuatorAddr>,
    /// Vision station conveyor (stopped for the classification window).
    pub vision_conveyor: ActuatorAddr,

    /// Turntable 1 rotation.
    pub tt1_turn: ActuatorAddr,
    /// Turntable 1 internal belt, forward.
    pub tt1_belt_forward: ActuatorAddr,
    /// Turntable 1 internal belt, backward.
    pub tt1_belt_backward: ActuatorAddr,
    /// Turntable 2 rotation.
    pub tt2_turn: ActuatorAddr,
    /// Turntable 2 internal belt, forward (discharge).
    pub tt2_belt_forward: ActuatorAddr,
    /// Turntable 2 internal belt, backward (load).
    pub tt2_belt_backward: ActuatorAddr,

    /// Shuttle fork lift.
    pub shuttle_lift: ActuatorAddr,
    /// Shuttle fork extend towards the rack.
    pub shuttle_extend_in: ActuatorAddr,
    /// Shuttle fork extend towards the pickup/drop-off side.
    pub shuttle_extend_out: ActuatorAddr,

    /// Light on while a retrieve request is handled.
    pub light_retrieving: ActuatorAddr,
    /// Light on while the requested product is being fetched.
    pub light_in_store: ActuatorAddr,
    /// Light pulsed when the requested product is not stored.
    pub light_not_in_store: ActuatorAddr,
}

impl Default for ActuatorMap {
    fn default() -> Self {
        Self {
            running_lamp: a(0),
            stop_lamp: a(1),
            emergency_lamp: a(2),
            stock_conveyor: a(14),
            central_conveyor: a(15),
            blue_line: group(&[82, 83]),
            blue_line_feed: group(&[30]),
            green_line: group(&[78, 79, 80, 81]),
            green_line_feed: Vec::new(),
            other_line: group(&[84, 85, 86, 87]),
            other_line_feed: Vec::new(),
            production_line: group(&[30]),
            production_line_feed: group(&[32]),
            vision_conveyor: a(32),
            tt1_turn: a(93),
            tt1_belt_forward: a(95),
            tt1_belt_backward: a(94),
            tt2_turn: a(38),
            tt2_belt_forward: a(40),
            tt2_belt_backward: a(39),
            shuttle_lift: a(34),
            shuttle_extend_in: a(35),
            shuttle_extend_out: a(36),
            light_retrieving: a(41),
            light_in_store: a(42),
            light_not_in_store: a(43),
        }
    }
}

impl ActuatorMap {
    /// Conveyors re-energized by a restart (turntable belts are restored separately).
    pub fn conveyors(&self) -> Vec<ActuatorAddr> {
        let mut out = Vec::new();
        for set in [
            &self.blue_line,
            &self.blue_line_feed,
            &self.green_line,
            &self.green_line_feed,
            &self.other_line,
            &self.other_line_feed,
            &self.production_line,
            &self.production_line_feed,
        ] {
            out.extend(set.iter().copied());
        }
        out.push(self.vision_conveyor);
        out.push(self.stock_conveyor);
        out.push(self.central_conveyor);
        dedup(out)
    }

    /// Every actuator a stop or emergency must de-energize.
    pub fn tracked(&self) -> Vec<ActuatorAddr> {
        let mut out = self.conveyors();
        out.extend([
            self.tt1_belt_forward,
            self.tt1_belt_backward,
            self.tt2_turn,
            self.tt2_belt_forward,
            self.tt2_belt_backward,
            self.shuttle_lift,
            self.shuttle_extend_in,
            self.shuttle_extend_out,
        ]);
        dedup(out)
    }

    /// Highest actuator address in use.
    pub fn max_address(&self) -> u16 {
        let mut all = self.tracked();
        all.extend([
            self.running_lamp,
            self.stop_lamp,
            self.emergency_lamp,
            self.tt1_turn,
            self.light_retrieving,
            self.light_in_store,
            self.light_not_in_store,
        ]);
        all.iter().map(|a| a.raw()).max().unwrap_or(0)
    }

    /// Single-purpose outputs that must not share an address with anything else.
    fn exclusive(&self) -> Vec<(&'static str, ActuatorAddr)> {
        vec![
            ("running_lamp", self.running_lamp),
            ("stop_lamp", self.stop_lamp),
            ("emergency_lamp", self.emergency_lamp),
            ("tt1_turn", self.tt1_turn),
            ("tt1_belt_forward", self.tt1_belt_forward),
            ("tt1_belt_backward", self.tt1_belt_backward),
            ("tt2_turn", self.tt2_turn),
            ("tt2_belt_forward", self.tt2_belt_forward),
            ("tt2_belt_backward", self.tt2_belt_backward),
            ("shuttle_lift", self.shuttle_lift),
            ("shuttle_extend_in", self.shuttle_extend_in),
            ("shuttle_extend_out", self.shuttle_extend_out),
            ("light_retrieving", self.light_retrieving),
            ("light_in_store", self.light_in_store),
            ("light_not_in_store", self.light_not_in_store),
        ]
    }
}

fn dedup(mut addrs: Vec<ActuatorAddr>) -> Vec<ActuatorAddr> {
    addrs.sort();
    addrs.dedup();
    addrs
}

// ─── Registers ──────────────────────────────────────────────────────

/// 16-bit holding registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegisterMap {
    /// Shuttle target position.
    pub shuttle_target: RegisterAddr,
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self {
            shuttle_target: RegisterAddr(0),
        }
    }
}

// ─── Map ────────────────────────────────────────────────────────────

/// Complete address map of the cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IoMap {
    /// Sensor addresses.
    pub sensors: SensorMap,
    /// Actuator addresses.
    pub actuators: ActuatorMap,
    /// Register addresses.
    pub registers: RegisterMap,
}

impl IoMap {
    /// Number of coils a scan snapshot must cover.
    pub fn required_snapshot_len(&self) -> usize {
        self.sensors
            .entries()
            .iter()
            .map(|(_, addr)| addr.index() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Validate the map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - two sensor roles share an address
    /// - a single-purpose actuator shares its address with another role
    /// - two infeed lines share a conveyor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut sensors: HashMap<SensorAddr, &'static str> = HashMap::new();
        for (name, addr) in self.sensors.entries() {
            if let Some(other) = sensors.insert(addr, name) {
                return Err(ConfigError::ValidationError(format!(
                    "sensor {addr} assigned to both '{other}' and '{name}'"
                )));
            }
        }

        let acts = &self.actuators;
        let mut owners: HashMap<ActuatorAddr, &'static str> = HashMap::new();
        for (name, addr) in acts.exclusive() {
            if let Some(other) = owners.insert(addr, name) {
                return Err(ConfigError::ValidationError(format!(
                    "actuator {addr} assigned to both '{other}' and '{name}'"
                )));
            }
        }
        for (name, set) in [
            ("blue_line", &acts.blue_line),
            ("green_line", &acts.green_line),
            ("other_line", &acts.other_line),
        ] {
            if set.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{name} has no conveyors"
                )));
            }
            for addr in set {
                if let Some(other) = owners.insert(*addr, name) {
                    return Err(ConfigError::ValidationError(format!(
                        "actuator {addr} assigned to both '{other}' and '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }
}
