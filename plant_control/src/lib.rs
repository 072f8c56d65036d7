//! # Plant Control Library
//!
//! Sequencing layer of the sorting and storage plant. A single fixed-rate
//! scan thread turns sensor snapshots into edges; everything that moves
//! steel runs on worker threads coordinated through two FIFO job queues and
//! per-resource ownership guards.
//!
//! ## Architecture
//!
//! ```text
//!  ScanLoop ──► EventProcessor ──► EdgeDetector
//!                    │
//!      ┌─────────────┼──────────────────┬───────────────┐
//!      ▼             ▼                  ▼               ▼
//!  Supervisor   LineController   ArrivalDispatcher   OrderManager
//!  (buttons)    (lines, shuttle)  (TT1 queue + HAL)       │
//!                    │                  │ classified      │
//!                    ▼                  ▼                 │
//!            WarehouseAllocator   Tt2Dispatcher ◄─────────┘
//!                                  (TT2 queue, routing)
//! ```
//!
//! ## Ownership rules
//!
//! 1. A turntable accepts a command only when no sequence owns it and no
//!    belt watcher is alive; otherwise the caller waits, bounded, then is
//!    rejected.
//! 2. Turntable-1 jobs run strictly FIFO; turntable-2 jobs run strictly FIFO
//!    on their own queue; one classification window at a time.
//! 3. Line flags and actuator writes share one output lock with the
//!    turntables (lock order: table, then outputs).

pub mod cell;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod edge;
pub mod error;
pub mod events;
pub mod lines;
pub mod orders;
pub mod state;
pub mod supervisor;
pub mod sync;
pub mod turntable;
pub mod warehouse;

pub use crate::config::PlantConfig;
pub use crate::error::{ControlError, TurntableError};
pub use crate::cell::Plant;
