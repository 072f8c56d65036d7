//! Prelude module for common re-exports.
//!
//! ```rust
//! use plant_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::hal::{HalError, IoBoundary, ScanConfig, SimulationConfig};
pub use crate::io::{ActuatorAddr, IoMap, RegisterAddr, SensorAddr};

// ─── Domain ─────────────────────────────────────────────────────────
pub use crate::color::BoxColor;
pub use crate::store::{OrderConfig, OrderStore, StoreError};
