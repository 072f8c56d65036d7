//! Hardware abstraction shared by the HAL and the controller.
//!
//! - [`boundary`] - `IoBoundary` trait, `HalError`, driver factory type
//! - [`config`] - Scan loop and simulation driver configuration

pub mod boundary;
pub mod config;

pub use boundary::{DriverFactory, DriverSettings, HalError, IoBoundary};
pub use config::{LinkedSensor, RegisterPulse, ScanConfig, SimulationConfig};
