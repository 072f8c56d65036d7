//! Error types of the control layer.
//!
//! Only startup returns errors to the binary. Inside running sequences every
//! failure is logged and the sequence falls back to its fail-safe.

use plant::config::ConfigError;
use plant::hal::HalError;
use plant::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Reasons a turntable command was not executed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurntableError {
    /// Commands are accepted only while the machine is running.
    #[error("turntable commands require the machine to be running")]
    NotRunning,

    /// The table stayed owned (or its belt watcher alive) for the whole guard window.
    #[error("turntable busy after waiting {waited:?}")]
    Busy {
        /// How long the guard waited before rejecting.
        waited: Duration,
    },

    /// Shutdown was requested while waiting for the table.
    #[error("shutdown in progress")]
    ShuttingDown,

    /// The command worker thread could not be started.
    #[error("failed to spawn turntable worker: {0}")]
    Spawn(String),
}

/// Top-level error of the controller.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O driver failure.
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Order store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Turntable command rejected.
    #[error(transparent)]
    Turntable(#[from] TurntableError),

    /// A worker thread could not be started.
    #[error("failed to spawn worker '{0}'")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_reports_wait() {
        let err = TurntableError::Busy {
            waited: Duration::from_millis(1500),
        };
        assert!(err.to_string().contains("1.5s"));
    }

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: ControlError = HalError::DriverNotFound("modbus".to_string()).into();
        assert_eq!(err.to_string(), "Driver not found: modbus");

        let err: ControlError = TurntableError::NotRunning.into();
        assert!(matches!(err, ControlError::Turntable(TurntableError::NotRunning)));
    }
}
