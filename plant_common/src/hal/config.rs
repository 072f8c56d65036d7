//! Scan loop and simulation driver configuration.
//!
//! ```toml
//! [scan]
//! period_ms = 50
//! snapshot_len = 120
//!
//! [simulation]
//! initial_high = [9, 77, 80, 83]
//!
//! [[simulation.links]]
//! actuator = 95        # TT1 belt forward
//! trigger = true
//! sensor = 94          # TT1 back limit
//! result = true
//! delay_s = 1.2
//!
//! [[simulation.register_pulses]]
//! register = 0         # shuttle target
//! busy_sensor = 8      # shuttle moving
//! busy_s = 1.5
//! ```

use crate::config::{check_seconds, ConfigError};
use crate::io::{ActuatorAddr, RegisterAddr, SensorAddr};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default scan period in milliseconds.
pub const DEFAULT_SCAN_PERIOD_MS: u64 = 50;

/// Default number of coils read per scan.
pub const DEFAULT_SNAPSHOT_LEN: usize = 120;

/// Fixed-period scan loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Scan period in milliseconds.
    pub period_ms: u64,
    /// Number of coils read per scan (addresses `0..snapshot_len`).
    pub snapshot_len: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_SCAN_PERIOD_MS,
            snapshot_len: DEFAULT_SNAPSHOT_LEN,
        }
    }
}

impl ScanConfig {
    /// Scan period as a `Duration`.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Validate against the number of coils the address map needs.
    pub fn validate(&self, required_len: usize) -> Result<(), ConfigError> {
        if self.period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scan.period_ms must be > 0".to_string(),
            ));
        }
        if self.snapshot_len < required_len {
            return Err(ConfigError::ValidationError(format!(
                "scan.snapshot_len {} does not cover sensor address {}",
                self.snapshot_len,
                required_len.saturating_sub(1)
            )));
        }
        Ok(())
    }
}

/// Sensor reaction to an actuator edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkedSensor {
    /// Actuator whose edge triggers the reaction.
    pub actuator: ActuatorAddr,
    /// Actuator value that triggers the reaction (rising = true).
    pub trigger: bool,
    /// Sensor that reacts.
    pub sensor: SensorAddr,
    /// Value the sensor takes.
    pub result: bool,
    /// Delay before the sensor changes.
    #[serde(default)]
    pub delay_s: f64,
}

/// Busy pulse raised on a sensor whenever a register is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterPulse {
    /// Register that starts the pulse.
    pub register: RegisterAddr,
    /// Sensor held high while the pulse lasts.
    pub busy_sensor: SensorAddr,
    /// Pulse length.
    pub busy_s: f64,
}

/// Behaviour of the in-memory simulation driver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Sensors that read `true` at startup (normally-closed contacts).
    pub initial_high: Vec<SensorAddr>,
    /// Linked actuator → sensor reactions.
    pub links: Vec<LinkedSensor>,
    /// Register write → busy sensor pulses.
    pub register_pulses: Vec<RegisterPulse>,
}

impl SimulationConfig {
    /// Validate reaction timings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for link in &self.links {
            check_seconds(&format!("simulation.links[{}].delay_s", link.actuator), link.delay_s)?;
        }
        for pulse in &self.register_pulses {
            check_seconds(
                &format!("simulation.register_pulses[{}].busy_s", pulse.register),
                pulse.busy_s,
            )?;
        }
        Ok(())
    }
}
