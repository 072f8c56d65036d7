//! I/O boundary trait and error types.
//!
//! This module defines:
//! - `IoBoundary` trait - the polled boolean/register I/O map of the cell
//! - `HalError` enum - Error types for I/O operations
//! - `DriverFactory` type alias - Factory function type for drivers

use crate::hal::config::{ScanConfig, SimulationConfig};
use crate::io::{ActuatorAddr, IoMap, RegisterAddr, SensorAddr};
use std::sync::Arc;
use thiserror::Error;

/// Error types for I/O operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Transport/communication error
    #[error("I/O communication error: {0}")]
    CommunicationError(String),

    /// Address outside the driver's address space
    #[error("Address {addr} out of range for {space} (size {size})")]
    AddressOutOfRange {
        /// Address space name ("sensor", "actuator", "register")
        space: &'static str,
        /// Offending raw address
        addr: u16,
        /// Size of the address space
        size: usize,
    },

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Settings handed to a driver factory.
#[derive(Debug, Clone, Copy)]
pub struct DriverSettings<'a> {
    /// Address map of the cell
    pub io: &'a IoMap,
    /// Scan configuration (snapshot length)
    pub scan: &'a ScanConfig,
    /// Simulation behaviour (ignored by hardware drivers)
    pub simulation: &'a SimulationConfig,
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn(&DriverSettings<'_>) -> Result<Arc<dyn IoBoundary>, HalError>;

/// The polled I/O map of the cell.
///
/// Implementations are shared between the scan thread and every sequence
/// worker as `Arc<dyn IoBoundary>`, so all methods take `&self` and the
/// implementation is responsible for its own interior locking.
///
/// # Contract
///
/// | Operation | Blocking | Notes |
/// |-----------|----------|-------|
/// | `read_sensor` / `read_actuator` | short | one point |
/// | `set_actuator` | short | one point |
/// | `read_register` / `write_register` | short | 16-bit signed |
/// | `snapshot` | short | coils `0..len` in one consistent read |
pub trait IoBoundary: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Read a boolean sensor.
    fn read_sensor(&self, addr: SensorAddr) -> Result<bool, HalError>;

    /// Read back the current state of an actuator.
    fn read_actuator(&self, addr: ActuatorAddr) -> Result<bool, HalError>;

    /// Drive an actuator.
    fn set_actuator(&self, addr: ActuatorAddr, value: bool) -> Result<(), HalError>;

    /// Read a holding register.
    fn read_register(&self, addr: RegisterAddr) -> Result<i16, HalError>;

    /// Write a holding register.
    fn write_register(&self, addr: RegisterAddr, value: i16) -> Result<(), HalError>;

    /// Read sensors `0..len` as one snapshot.
    fn snapshot(&self, len: usize) -> Result<Vec<bool>, HalError>;
}
