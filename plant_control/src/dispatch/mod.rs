//! Job queues that move boxes through the two turntables.
//!
//! # Module Structure
//!
//! - [`worker`] - generic single-consumer FIFO with a halt sentinel
//! - [`arrival`] - turntable-1 queue: arrivals from the infeed lines and
//!   vision classification jobs
//! - [`classify`] - vision classification window
//! - [`tt2`] - turntable-2 queue and the stock/order routing decision
//!
//! ```text
//!  EventProcessor ──► ArrivalDispatcher ──(classified)──► Tt2Dispatcher
//!                      tt1-dispatch thread                 tt2-dispatch thread
//! ```
//!
//! The two queues are independent: turntable-2 work never waits for
//! turntable-1 jobs, only for the jobs ahead of it on its own queue.

pub mod arrival;
pub mod classify;
pub mod tt2;
pub mod worker;

pub use arrival::{ArrivalDispatcher, ArrivalJob, ArrivalPhase};
pub use classify::{Classification, ClassificationSink, VisionClassifier};
pub use tt2::{Tt2Dispatcher, Tt2Job};
pub use worker::QueueWorker;
