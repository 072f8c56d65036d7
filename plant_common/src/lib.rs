//! Plant Common Library
//!
//! This crate provides shared types and configuration loading utilities
//! for all plant workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`hal`] - I/O boundary trait, HAL errors and scan/simulation configuration
//! - [`io`] - Sensor/actuator/register addresses and the plant address map
//! - [`color`] - Box color classes shared by sorting, orders and warehouse
//! - [`store`] - Order configuration persistence
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with alias for shorter imports:
//! ```toml
//! [dependencies]
//! plant = { package = "plant_common", path = "../plant_common" }
//! ```
//!
//! Then import:
//! ```rust,ignore
//! use plant::config::{ConfigLoader, SharedConfig};
//! use plant::io::{IoMap, SensorAddr};
//! ```

pub mod color;
pub mod config;
pub mod hal;
pub mod io;
pub mod prelude;
pub mod store;
