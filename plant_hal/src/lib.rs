//! # Plant HAL Library
//!
//! I/O side of the plant controller: pluggable drivers behind the
//! `IoBoundary` trait and the fixed-period scan loop that feeds the
//! controller with coil snapshots.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations (simulation)
//! - [`scan`] - ScanLoop, fixed-period snapshot polling
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          plant_hal                               │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ ScanHandler │◄───│  ScanLoop    │    │  Driver Registry    │  │
//! │  │ (controller)│    │  (period)    │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └──────────┬──────────┘  │
//! │                            │ snapshot()            │ create      │
//! │                            ▼                       ▼             │
//! │                   ┌──────────────────────────────────┐           │
//! │                   │  Arc<dyn IoBoundary>             │           │
//! │                   └──────────────────────────────────┘           │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;
pub mod scan;

// Re-export key types for convenience
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::SimulatedIo;
pub use crate::scan::{ScanHandler, ScanLoop, ScanStats};
