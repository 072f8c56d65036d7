//! Simulation driver.
//!
//! Keeps the whole I/O map in memory. Actuator edges can be linked to
//! delayed sensor changes and register writes can raise a busy pulse on a
//! sensor, which is enough to run the sorting cell without hardware.

mod io;

pub use io::SimulatedIo;

use plant::hal::{DriverSettings, HalError, IoBoundary};
use std::sync::Arc;

/// Factory function for creating the simulation driver.
pub fn create_driver(settings: &DriverSettings<'_>) -> Result<Arc<dyn IoBoundary>, HalError> {
    settings
        .simulation
        .validate()
        .map_err(|e| HalError::ConfigError(e.to_string()))?;
    Ok(Arc::new(SimulatedIo::from_settings(settings)))
}
