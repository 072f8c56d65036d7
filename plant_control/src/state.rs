//! Machine state module root.
//!
//! Machine lifecycle shared by every sequence as its run-permission gate.

pub mod machine;

pub use machine::{MachineEvent, MachineState, MachineStateMachine, TransitionResult};
