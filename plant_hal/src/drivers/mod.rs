//! Built-in I/O drivers.

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers with the given registry.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
}
