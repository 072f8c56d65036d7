//! Fixed-period scan loop.
//!
//! Every period the loop reads sensors `0..snapshot_len` in one snapshot
//! and hands it to a [`ScanHandler`]. The handler must return quickly;
//! anything long-running belongs on a worker thread.
//!
//! ```text
//!   ┌──────── period ────────┐┌──────── period ────────┐
//!   │ snapshot │ on_scan │ sleep ││ snapshot │ on_scan │ sleep │
//! ```
//!
//! A failed snapshot skips that cycle's handler call and the loop goes on.

use plant::hal::{HalError, IoBoundary, ScanConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Receiver of scan snapshots.
pub trait ScanHandler {
    /// Process one snapshot (coils `0..snapshot_len`).
    fn on_scan(&mut self, snapshot: &[bool]);
}

impl<F: FnMut(&[bool])> ScanHandler for F {
    fn on_scan(&mut self, snapshot: &[bool]) {
        self(snapshot)
    }
}

/// Scan loop timing statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Completed cycles (including skipped ones).
    pub cycle_count: u64,
    /// Cycles whose work exceeded the period.
    pub timing_violations: u64,
    /// Longest cycle work time.
    pub max_cycle_time_us: u64,
    /// Cycles skipped because the snapshot read failed.
    pub skipped_scans: u64,
    total_cycle_time_us: u64,
}

impl ScanStats {
    /// Mean cycle work time.
    pub fn avg_cycle_time_us(&self) -> u64 {
        if self.cycle_count > 0 {
            self.total_cycle_time_us / self.cycle_count
        } else {
            0
        }
    }
}

/// Fixed-period snapshot poller.
pub struct ScanLoop {
    io: Arc<dyn IoBoundary>,
    period: Duration,
    snapshot_len: usize,
    running: Arc<AtomicBool>,
    stats: ScanStats,
}

impl ScanLoop {
    /// Create a loop over `io` with the given scan settings.
    pub fn new(io: Arc<dyn IoBoundary>, config: &ScanConfig) -> Self {
        Self {
            io,
            period: config.period(),
            snapshot_len: config.snapshot_len,
            running: Arc::new(AtomicBool::new(true)),
            stats: ScanStats::default(),
        }
    }

    /// Run until the running flag is cleared.
    ///
    /// The flag starts out set; clearing it before `run` makes the call
    /// return immediately.
    pub fn run(&mut self, handler: &mut dyn ScanHandler) -> Result<(), HalError> {
        if self.period.is_zero() {
            return Err(HalError::ConfigError("scan period must be > 0".to_string()));
        }
        info!(
            "Starting scan loop (period={}ms, snapshot_len={})",
            self.period.as_millis(),
            self.snapshot_len
        );

        while self.running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();

            match self.io.snapshot(self.snapshot_len) {
                Ok(snapshot) => handler.on_scan(&snapshot),
                Err(e) => {
                    self.stats.skipped_scans += 1;
                    if self.stats.skipped_scans <= 10 || self.stats.skipped_scans % 1000 == 0 {
                        warn!("Scan #{} skipped: {}", self.stats.skipped_scans, e);
                    }
                }
            }

            let cycle_time_us = cycle_start.elapsed().as_micros() as u64;
            self.stats.cycle_count += 1;
            self.stats.total_cycle_time_us += cycle_time_us;
            if cycle_time_us > self.stats.max_cycle_time_us {
                self.stats.max_cycle_time_us = cycle_time_us;
            }

            if cycle_time_us > self.period.as_micros() as u64 {
                self.stats.timing_violations += 1;
                if self.stats.timing_violations <= 10 || self.stats.timing_violations % 1000 == 0 {
                    warn!(
                        "Timing violation #{}: scan took {}us (period {}ms)",
                        self.stats.timing_violations,
                        cycle_time_us,
                        self.period.as_millis()
                    );
                }
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Scan loop: {} cycles, avg={}us, max={}us, violations={}",
                    self.stats.cycle_count,
                    self.stats.avg_cycle_time_us(),
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations
                );
            }
        }

        info!(
            "Scan loop stopped after {} cycles ({} violations, {} skipped)",
            self.stats.cycle_count, self.stats.timing_violations, self.stats.skipped_scans
        );
        Ok(())
    }

    /// Get a handle to the running flag (for signal handlers).
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Get timing statistics.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedIo;
    use plant::hal::SimulationConfig;
    use plant::io::SensorAddr;

    fn sim() -> Arc<SimulatedIo> {
        Arc::new(SimulatedIo::new(&SimulationConfig::default(), 16, 16, 1))
    }

    fn config(snapshot_len: usize) -> ScanConfig {
        ScanConfig {
            period_ms: 2,
            snapshot_len,
        }
    }

    #[test]
    fn handler_sees_snapshots_until_stopped() {
        let io = sim();
        io.set_sensor(SensorAddr(3), true);
        let mut scan = ScanLoop::new(io.clone(), &config(8));
        let running = scan.running_flag();

        let mut seen = Vec::new();
        let mut handler = |snapshot: &[bool]| {
            seen.push(snapshot.to_vec());
            if seen.len() == 5 {
                running.store(false, Ordering::SeqCst);
            }
        };
        scan.run(&mut handler).unwrap();

        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|s| s.len() == 8 && s[3]));
        assert_eq!(scan.stats().cycle_count, 5);
        assert_eq!(scan.stats().skipped_scans, 0);
    }

    #[test]
    fn failed_snapshot_skips_handler() {
        let io = sim();
        let mut scan = ScanLoop::new(io, &config(64));
        let running = scan.running_flag();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            running.store(false, Ordering::SeqCst);
        });

        let mut calls = 0;
        let mut handler = |_: &[bool]| calls += 1;
        scan.run(&mut handler).unwrap();
        stopper.join().unwrap();

        assert_eq!(calls, 0);
        assert!(scan.stats().skipped_scans > 0);
        assert_eq!(scan.stats().skipped_scans, scan.stats().cycle_count);
    }

    #[test]
    fn cleared_flag_returns_immediately() {
        let mut scan = ScanLoop::new(sim(), &config(8));
        scan.running_flag().store(false, Ordering::SeqCst);
        let mut calls = 0;
        let mut handler = |_: &[bool]| calls += 1;
        scan.run(&mut handler).unwrap();
        assert_eq!(calls, 0);
        assert_eq!(scan.stats(), ScanStats::default());
    }
}
