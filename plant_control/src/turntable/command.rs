//! Turntable commands.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Internal belt direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeltDirection {
    /// Forward coil energized.
    Forward,
    /// Backward coil energized.
    Backward,
    /// Both coils off.
    #[default]
    Stop,
}

impl BeltDirection {
    /// Direction that undoes this one (`Stop` stays `Stop`).
    pub const fn reversed(self) -> Self {
        match self {
            BeltDirection::Forward => BeltDirection::Backward,
            BeltDirection::Backward => BeltDirection::Forward,
            BeltDirection::Stop => BeltDirection::Stop,
        }
    }
}

impl fmt::Display for BeltDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BeltDirection::Forward => "forward",
            BeltDirection::Backward => "backward",
            BeltDirection::Stop => "stop",
        })
    }
}

/// Physical limit sensor of a turntable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Limit {
    /// Front limit.
    Front,
    /// Back limit.
    Back,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Limit::Front => "front",
            Limit::Back => "back",
        })
    }
}

/// One exclusive turntable motion.
///
/// # Example
///
/// ```
/// use plant_control::turntable::{BeltDirection, Limit, TurntableCommand};
/// use std::time::Duration;
///
/// let cmd = TurntableCommand::belt(BeltDirection::Backward)
///     .turn(true)
///     .stop_at(Limit::Front, Duration::from_secs(3));
/// assert_eq!(cmd.stop_limit, Some(Limit::Front));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurntableCommand {
    /// Rotation request; `None` holds the current rotation.
    pub turn: Option<bool>,
    /// Belt direction to apply.
    pub belt: BeltDirection,
    /// Limit that ends the belt motion, watched by a belt watcher.
    pub stop_limit: Option<Limit>,
    /// Watcher fail-safe timeout.
    pub timeout: Duration,
}

impl TurntableCommand {
    /// Drive the belt, holding rotation, with no watcher.
    pub const fn belt(belt: BeltDirection) -> Self {
        Self {
            turn: None,
            belt,
            stop_limit: None,
            timeout: Duration::ZERO,
        }
    }

    /// Stop the belt, holding rotation.
    pub const fn stop() -> Self {
        Self::belt(BeltDirection::Stop)
    }

    /// Request a rotation state.
    pub const fn turn(mut self, on: bool) -> Self {
        self.turn = Some(on);
        self
    }

    /// Set the rotation request, `None` to hold.
    pub const fn with_turn(mut self, turn: Option<bool>) -> Self {
        self.turn = turn;
        self
    }

    /// Stop the belt at `limit`, or after `timeout` at the latest.
    pub const fn stop_at(mut self, limit: Limit, timeout: Duration) -> Self {
        self.stop_limit = Some(limit);
        self.timeout = timeout;
        self
    }
}

impl fmt::Display for TurntableCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.turn {
            Some(on) => write!(f, "turn={on} ")?,
            None => f.write_str("turn=hold ")?,
        }
        write!(f, "belt={}", self.belt)?;
        if let Some(limit) = self.stop_limit {
            write!(f, " until {limit} ({:?})", self.timeout)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_composes() {
        let cmd = TurntableCommand::belt(BeltDirection::Forward)
            .with_turn(Some(false))
            .stop_at(Limit::Back, Duration::from_secs(3));
        assert_eq!(cmd.turn, Some(false));
        assert_eq!(cmd.to_string(), "turn=false belt=forward until back (3s)");
        assert_eq!(TurntableCommand::stop().to_string(), "turn=hold belt=stop");
    }

    #[test]
    fn reversed_direction() {
        assert_eq!(BeltDirection::Forward.reversed(), BeltDirection::Backward);
        assert_eq!(BeltDirection::Stop.reversed(), BeltDirection::Stop);
    }
}
