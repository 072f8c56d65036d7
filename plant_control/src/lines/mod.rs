//! Conveyor lines and the warehouse shuttle.
//!
//! - [`LineController`] - idempotent run / unconditional stop of the three
//!   infeed lines and the production line
//! - [`ShuttleController`] - store and retrieve routines of the warehouse
//!   shuttle, one at a time
//! - [`StockQueue`] - colors of boxes on their way to generic stock

mod controller;
mod shuttle;

pub use controller::LineController;
pub use shuttle::{ShuttleController, ShuttleOutcome, ShuttleTask, StockQueue};

use plant::color::BoxColor;
use plant::io::{ActuatorAddr, ActuatorMap};
use std::fmt;

/// A conveyor line with its own running flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Blue infeed.
    Blue,
    /// Green infeed.
    Green,
    /// Other/empty infeed.
    Other,
    /// Production conveyor after the vision station.
    Production,
}

impl Line {
    /// All lines.
    pub const ALL: [Line; 4] = [Line::Blue, Line::Green, Line::Other, Line::Production];

    /// Number of lines.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index for per-line tables.
    pub const fn index(self) -> usize {
        match self {
            Line::Blue => 0,
            Line::Green => 1,
            Line::Other => 2,
            Line::Production => 3,
        }
    }

    /// Infeed line carrying boxes of `color`.
    pub const fn from_color(color: BoxColor) -> Self {
        match color {
            BoxColor::Blue => Line::Blue,
            BoxColor::Green => Line::Green,
            BoxColor::Other => Line::Other,
        }
    }

    /// Name used in logs and thread names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Line::Blue => "blue",
            Line::Green => "green",
            Line::Other => "other",
            Line::Production => "production",
        }
    }

    /// Conveyors switched on by `run` and off by `stop`.
    pub fn conveyors(self, map: &ActuatorMap) -> &[ActuatorAddr] {
        match self {
            Line::Blue => &map.blue_line,
            Line::Green => &map.green_line,
            Line::Other => &map.other_line,
            Line::Production => &map.production_line,
        }
    }

    /// Conveyors switched on by `run` but left running by `stop`.
    pub fn feed(self, map: &ActuatorMap) -> &[ActuatorAddr] {
        match self {
            Line::Blue => &map.blue_line_feed,
            Line::Green => &map.green_line_feed,
            Line::Other => &map.other_line_feed,
            Line::Production => &map.production_line_feed,
        }
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
