//! Belt watcher loop.
//!
//! Runs on its own thread after a belt command with a stop limit. The
//! sequencer owns the final belt-off write; this module only decides when
//! the motion is over.

use crate::config::TurntableConfig;
use crate::context::PlantContext;
use plant::io::SensorAddr;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Why a belt watcher ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The limit sensor was reached and held for the debounce count.
    Limit,
    /// The fail-safe timeout expired first.
    Timeout,
    /// Shutdown, a stop, or a newer command ended the watch early.
    Interrupted,
}

impl fmt::Display for WatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatchOutcome::Limit => "limit",
            WatchOutcome::Timeout => "timeout",
            WatchOutcome::Interrupted => "interrupted",
        })
    }
}

pub(crate) struct Watch<'a> {
    pub ctx: &'a PlantContext,
    pub config: &'a TurntableConfig,
    pub cancel: &'a AtomicBool,
    pub sensor: SensorAddr,
    pub timeout: Duration,
    /// When the belt was energized.
    pub started: Instant,
}

impl Watch<'_> {
    fn should_stop(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
            || self.ctx.shutdown().is_triggered()
            || !self.ctx.is_running()
    }

    /// Sleep in poll slices. Returns `false` if the watch must end.
    fn pause(&self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        loop {
            if self.should_stop() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            if self.ctx.sleep(self.config.poll().min(deadline - now)) {
                return false;
            }
        }
    }

    /// Watch the limit sensor until it is reached, the timeout expires or
    /// the watch is interrupted.
    ///
    /// A sensor already true after the grace period must drop and rise again
    /// before it counts.
    pub fn run(&self) -> WatchOutcome {
        if !self.pause(self.config.grace()) {
            return WatchOutcome::Interrupted;
        }
        let mut armed = !self.ctx.read(self.sensor);
        let deadline = Instant::now() + self.timeout;
        let mut hits = 0;

        let outcome = loop {
            if self.should_stop() {
                return WatchOutcome::Interrupted;
            }
            if self.ctx.read(self.sensor) {
                if armed {
                    hits += 1;
                    if hits >= self.config.debounce {
                        break WatchOutcome::Limit;
                    }
                }
            } else {
                armed = true;
                hits = 0;
            }
            if Instant::now() >= deadline {
                break WatchOutcome::Timeout;
            }
            if self.ctx.sleep(self.config.poll()) {
                return WatchOutcome::Interrupted;
            }
        };

        // Anti-ricochet: the belt stays on for the minimum time.
        let min_off = self.started + self.config.min_on();
        let now = Instant::now();
        if now < min_off && !self.pause(min_off - now) {
            return WatchOutcome::Interrupted;
        }
        outcome
    }
}
