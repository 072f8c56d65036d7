//! Turntable sequencing.
//!
//! Both transfer tables share one sequencer type. A table accepts a
//! [`TurntableCommand`] only when it is idle: no sequence owns it and no belt
//! watcher is alive. The command applies rotation and belt direction and,
//! when a stop limit is given, hands the belt to a watcher that switches it
//! off at the limit or at the fail-safe timeout.
//!
//! ```text
//!  caller ──► guard wait ──► own ──► apply turn/belt ──► release
//!              (≤ 10 s)                    │
//!                                          └──► watcher: grace → debounce → min-on → belt off
//! ```

mod command;
mod sequencer;
mod watcher;

pub use command::{BeltDirection, Limit, TurntableCommand};
pub use sequencer::TurntableSequencer;
pub use watcher::WatchOutcome;

use plant::io::{ActuatorAddr, IoMap, SensorAddr};

/// Actuators and limit sensors of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurntableIo {
    /// Rotation actuator.
    pub turn: ActuatorAddr,
    /// Belt forward actuator.
    pub belt_forward: ActuatorAddr,
    /// Belt backward actuator.
    pub belt_backward: ActuatorAddr,
    /// Front limit, if fitted.
    pub front_limit: Option<SensorAddr>,
    /// Back limit, if fitted.
    pub back_limit: Option<SensorAddr>,
}

impl TurntableIo {
    /// Turntable 1 (arrival table).
    pub fn tt1(map: &IoMap) -> Self {
        Self {
            turn: map.actuators.tt1_turn,
            belt_forward: map.actuators.tt1_belt_forward,
            belt_backward: map.actuators.tt1_belt_backward,
            front_limit: Some(map.sensors.tt1_front_limit),
            back_limit: Some(map.sensors.tt1_back_limit),
        }
    }

    /// Turntable 2 (routing table).
    pub fn tt2(map: &IoMap) -> Self {
        Self {
            turn: map.actuators.tt2_turn,
            belt_forward: map.actuators.tt2_belt_forward,
            belt_backward: map.actuators.tt2_belt_backward,
            front_limit: map.sensors.tt2_front_limit,
            back_limit: map.sensors.tt2_back_limit,
        }
    }

    /// Sensor wired to `limit`.
    pub fn limit(&self, limit: Limit) -> Option<SensorAddr> {
        match limit {
            Limit::Front => self.front_limit,
            Limit::Back => self.back_limit,
        }
    }

    /// Actuator driving the belt in `dir`.
    pub fn belt_actuator(&self, dir: BeltDirection) -> Option<ActuatorAddr> {
        match dir {
            BeltDirection::Forward => Some(self.belt_forward),
            BeltDirection::Backward => Some(self.belt_backward),
            BeltDirection::Stop => None,
        }
    }
}
