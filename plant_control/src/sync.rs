//! Cancellation and ownership primitives shared by the workers.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ─── ShutdownToken ──────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Signal {
    triggered: Mutex<bool>,
    cond: Condvar,
}

/// Process-wide stop signal observed by every waiting loop.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    inner: Arc<Signal>,
}

impl ShutdownToken {
    /// Create an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger shutdown and wake every sleeper.
    pub fn trigger(&self) {
        *self.inner.triggered.lock() = true;
        self.inner.cond.notify_all();
    }

    /// Whether shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        *self.inner.triggered.lock()
    }

    /// Sleep for `dur` unless shutdown is triggered first.
    ///
    /// Returns `true` if the sleep was cut short by shutdown.
    pub fn sleep(&self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        let mut triggered = self.inner.triggered.lock();
        while !*triggered {
            if self.inner.cond.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }
        *triggered
    }
}

// ─── BusyFlag ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Busy {
    held: Mutex<bool>,
    cond: Condvar,
}

/// Single-owner flag for a physical resource.
///
/// Ownership is represented by a [`BusyGuard`]; dropping the guard frees the
/// resource, so the flag is released on every exit path, including panics.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag {
    inner: Arc<Busy>,
}

/// Ownership of a [`BusyFlag`]; can be moved to another thread.
#[derive(Debug)]
#[must_use = "the resource is released when the guard is dropped"]
pub struct BusyGuard {
    inner: Arc<Busy>,
}

impl BusyFlag {
    /// Create a free flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the resource is owned.
    pub fn is_busy(&self) -> bool {
        *self.inner.held.lock()
    }

    /// Take the resource if it is free.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        let mut held = self.inner.held.lock();
        if *held {
            return None;
        }
        *held = true;
        Some(BusyGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Wait until the resource is free and take it.
    ///
    /// Gives up when shutdown is triggered. The shutdown token is polled at
    /// `poll` so a release that never comes cannot block shutdown.
    pub fn acquire(&self, shutdown: &ShutdownToken, poll: Duration) -> Option<BusyGuard> {
        let mut held = self.inner.held.lock();
        while *held {
            if shutdown.is_triggered() {
                return None;
            }
            self.inner.cond.wait_for(&mut held, poll);
        }
        if shutdown.is_triggered() {
            return None;
        }
        *held = true;
        Some(BusyGuard {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        *self.inner.held.lock() = false;
        self.inner.cond.notify_all();
    }
}
