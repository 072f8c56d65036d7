//! I/O addressing for the plant.
//!
//! Sensors, actuators and holding registers live in three independent
//! address spaces of the I/O boundary. The newtypes in [`addr`] keep them
//! apart at compile time; [`map`] binds every physical point of the cell
//! to its address and is shared by the HAL and the controller.

pub mod addr;
pub mod map;

pub use addr::{ActuatorAddr, RegisterAddr, SensorAddr};
pub use map::{ActuatorMap, IoMap, RegisterMap, SensorMap};
