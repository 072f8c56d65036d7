//! Machine state transitions.
//!
//! Emergency → Idle ↔ Running/Stopped, driven only by operator buttons.
//!
//! ```text
//!            EmergencyReleased          Start / Restart
//!  Emergency ─────────────────► Idle ───────────────────► Running
//!      ▲                         │  Stop                   │  ▲
//!      │ EmergencyEngaged        ▼               Stop      │  │ Start / Restart
//!      └──────────────────── Stopped ◄────────────────────┘  │
//!                               └─────────────────────────────┘
//! ```
//!
//! The plant boots latched in `Emergency` until the emergency button reads
//! released.

use std::fmt;

/// Global machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineState {
    /// Emergency engaged (or not yet released since boot).
    Emergency,
    /// Released from emergency, waiting for Start.
    Idle,
    /// Sequences may drive actuators.
    Running,
    /// Stopped by the operator.
    Stopped,
}

impl MachineState {
    /// Lower-case name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            MachineState::Emergency => "emergency",
            MachineState::Idle => "idle",
            MachineState::Running => "running",
            MachineState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a MachineState transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, new state.
    Ok(MachineState),
    /// Transition rejected, reason.
    Rejected(&'static str),
}

/// Operator event that can trigger a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// Start button pressed.
    Start,
    /// Stop button pressed.
    Stop,
    /// Restart button pressed.
    Restart,
    /// Emergency button engaged.
    EmergencyEngaged,
    /// Emergency button released.
    EmergencyReleased,
}

/// MachineState manager holding the current state.
#[derive(Debug, Clone)]
pub struct MachineStateMachine {
    state: MachineState,
}

impl MachineStateMachine {
    /// Create a new machine state machine latched in Emergency.
    pub const fn new() -> Self {
        Self {
            state: MachineState::Emergency,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> MachineState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: MachineEvent) -> TransitionResult {
        use MachineEvent::*;
        use MachineState::*;

        let next = match (self.state, event) {
            (Idle | Stopped, Start) => Running,
            (Idle | Running, Stop) => Stopped,
            (Idle | Stopped | Running, Restart) => Running,
            (Idle | Stopped | Running, EmergencyEngaged) => Emergency,
            (Emergency, EmergencyReleased) => Idle,
            _ => {
                return TransitionResult::Rejected(invalid_transition_reason(self.state, event));
            }
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// Check if sequences may drive actuators.
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, MachineState::Running)
    }
}

impl Default for MachineStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_transition_reason(state: MachineState, event: MachineEvent) -> &'static str {
    use MachineEvent::*;
    use MachineState::*;
    match (state, event) {
        (Emergency, _) => "Emergency: only EmergencyReleased allowed",
        (_, EmergencyReleased) => "EmergencyReleased outside Emergency",
        (Running, Start) => "Running: already running",
        (Stopped, Stop) => "Stopped: already stopped",
        _ => "invalid event for current state",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
