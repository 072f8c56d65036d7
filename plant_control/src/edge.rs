//! Edge detection over scan snapshots.
//!
//! Each watched address carries an explicit [`EdgePolicy`] chosen at
//! registration; the detector keeps the previous value per registration and
//! reports the edges that fired, tagged with the caller's own label.
//!
//! | Policy | Initial previous | Fires when |
//! |--------|------------------|------------|
//! | `RisingEdge` | 0 | 0 → 1 |
//! | `FallTriggeredFromHigh` | 1 | any change whose new value is 0 |
//! | `Toggle { initial }` | `initial` | any change |
//! | `LevelWithInhibit` | 0 | 0 → 1 while the inhibit flag is clear |
//!
//! `FallTriggeredFromHigh` fires on the very first scan that reads 0, even
//! if no 1 was ever observed: presence sensors rest closed, so a box already
//! sitting at an infeed on boot is handled like a fresh arrival.
//!
//! Addresses past the end of the snapshot read as 0. The same address may
//! be registered more than once with different policies.

use plant::io::SensorAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag suppressing a `LevelWithInhibit` registration.
#[derive(Debug, Clone, Default)]
pub struct InhibitFlag(Arc<AtomicBool>);

impl InhibitFlag {
    /// Create a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the flag is set.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set the flag, returning the previous value.
    pub fn arm(&self) -> bool {
        self.0.swap(true, Ordering::SeqCst)
    }

    /// Clear the flag.
    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Edge rule attached to a watched address.
#[derive(Debug, Clone)]
pub enum EdgePolicy {
    /// Fire on 0 → 1.
    RisingEdge,
    /// Previous starts at 1; fire on changes to 0.
    FallTriggeredFromHigh,
    /// Fire on every change, in both directions.
    Toggle {
        /// Previous value assumed before the first scan.
        initial: bool,
    },
    /// Fire on 0 → 1 unless the flag is set.
    LevelWithInhibit(InhibitFlag),
}

impl EdgePolicy {
    fn initial(&self) -> bool {
        match self {
            EdgePolicy::RisingEdge | EdgePolicy::LevelWithInhibit(_) => false,
            EdgePolicy::FallTriggeredFromHigh => true,
            EdgePolicy::Toggle { initial } => *initial,
        }
    }

    fn fires(&self, prev: bool, cur: bool) -> bool {
        match self {
            EdgePolicy::RisingEdge => !prev && cur,
            EdgePolicy::FallTriggeredFromHigh => prev && !cur,
            EdgePolicy::Toggle { .. } => prev != cur,
            EdgePolicy::LevelWithInhibit(flag) => !prev && cur && !flag.is_set(),
        }
    }
}

/// An edge that fired during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge<T> {
    /// Caller's label for the registration.
    pub tag: T,
    /// Address that changed.
    pub addr: SensorAddr,
    /// Value read in this scan.
    pub value: bool,
}

#[derive(Debug, Clone)]
struct Watch<T> {
    addr: SensorAddr,
    policy: EdgePolicy,
    tag: T,
    prev: bool,
}

/// Per-address previous-value tracker.
#[derive(Debug, Clone)]
pub struct EdgeDetector<T> {
    watches: Vec<Watch<T>>,
}

impl<T: Copy> EdgeDetector<T> {
    /// Create a detector with no registrations.
    pub fn new() -> Self {
        Self {
            watches: Vec::new(),
        }
    }

    /// Watch `addr` under `policy`, reporting edges labelled `tag`.
    pub fn register(&mut self, addr: SensorAddr, policy: EdgePolicy, tag: T) {
        let prev = policy.initial();
        self.watches.push(Watch {
            addr,
            policy,
            tag,
            prev,
        });
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Compare one snapshot against the previous values.
    ///
    /// Edges are returned in registration order.
    pub fn handle_scan(&mut self, snapshot: &[bool]) -> Vec<Edge<T>> {
        let mut fired = Vec::new();
        for watch in &mut self.watches {
            let cur = watch.addr.read(snapshot);
            if watch.policy.fires(watch.prev, cur) {
                fired.push(Edge {
                    tag: watch.tag,
                    addr: watch.addr,
                    value: cur,
                });
            }
            watch.prev = cur;
        }
        fired
    }
}

impl<T: Copy> Default for EdgeDetector<T> {
    fn default() -> Self {
        Self::new()
    }
}
