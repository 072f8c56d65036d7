//! Vision classification window.
//!
//! ```text
//!   align (conveyor running) ─► stop conveyor ─► sample blue/green every
//!   sample_ms for window_ms ─► blue ≥ debounce ? Blue
//!                              : green ≥ debounce ? Green : Other
//! ```
//!
//! With `sample_while_running` the window is sampled first and the conveyor
//! is stopped afterwards. Only one window may be open at a time because the
//! vision sensors are shared.

use crate::config::ClassificationConfig;
use crate::context::PlantContext;
use plant::color::BoxColor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of one classification window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Decided color.
    pub color: BoxColor,
    /// Samples with the blue sensor on.
    pub blue: u32,
    /// Samples with the green sensor on.
    pub green: u32,
}

/// Receives the color of every classified box.
pub trait ClassificationSink: Send + Sync {
    /// Called once per completed window, on the turntable-1 worker.
    fn on_classified(&self, color: BoxColor);
}

/// Samples the vision sensors under the production conveyor.
pub struct VisionClassifier {
    ctx: Arc<PlantContext>,
    config: ClassificationConfig,
    open: AtomicBool,
}

struct WindowGuard<'a>(&'a AtomicBool);

impl Drop for WindowGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl VisionClassifier {
    /// Create a classifier.
    pub fn new(ctx: Arc<PlantContext>, config: ClassificationConfig) -> Self {
        Self {
            ctx,
            config,
            open: AtomicBool::new(false),
        }
    }

    /// Window timings.
    pub fn config(&self) -> &ClassificationConfig {
        &self.config
    }

    /// Whether a window is open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Run one window and decide the color.
    ///
    /// Returns `None` if another window is already open.
    pub fn classify(&self) -> Option<Classification> {
        if self
            .open
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Classification rejected, window already open");
            return None;
        }
        let _window = WindowGuard(&self.open);
        let conveyor = self.ctx.map().actuators.vision_conveyor;

        let (blue, green) = if self.config.sample_while_running {
            let counts = self.sample();
            self.ctx.write(conveyor, false);
            counts
        } else {
            self.ctx.sleep(Duration::from_millis(self.config.align_ms));
            self.ctx.write(conveyor, false);
            self.sample()
        };

        let color = decide(blue, green, self.config.debounce);
        info!(%color, blue, green, debounce = self.config.debounce, "Box classified");
        Some(Classification { color, blue, green })
    }

    /// Count blue and green hits over the window while the machine runs.
    fn sample(&self) -> (u32, u32) {
        let sensors = &self.ctx.map().sensors;
        let interval = Duration::from_millis(self.config.sample_ms);
        let deadline = Instant::now() + Duration::from_millis(self.config.window_ms);
        let (mut blue, mut green) = (0, 0);
        while Instant::now() < deadline && self.ctx.is_running() {
            if self.ctx.read(sensors.vision_blue) {
                blue += 1;
            }
            if self.ctx.read(sensors.vision_green) {
                green += 1;
            }
            if self.ctx.sleep(interval) {
                break;
            }
        }
        (blue, green)
    }
}

/// Blue wins ties: it is checked first.
fn decide(blue: u32, green: u32, debounce: u32) -> BoxColor {
    if blue >= debounce {
        BoxColor::Blue
    } else if green >= debounce {
        BoxColor::Green
    } else {
        BoxColor::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MachineEvent;
    use crate::sync::ShutdownToken;
    use plant::hal::{IoBoundary, SimulationConfig};
    use plant::io::{IoMap, SensorAddr};
    use plant_hal::SimulatedIo;
    use std::thread;

    fn classifier(config: ClassificationConfig) -> (Arc<SimulatedIo>, Arc<VisionClassifier>) {
        let io = Arc::new(SimulatedIo::new(&SimulationConfig::default(), 128, 128, 2));
        let ctx = Arc::new(PlantContext::new(io.clone(), IoMap::default(), ShutdownToken::new()));
        ctx.apply_event(MachineEvent::EmergencyReleased);
        ctx.apply_event(MachineEvent::Start);
        (io, Arc::new(VisionClassifier::new(ctx, config)))
    }

    fn fast() -> ClassificationConfig {
        ClassificationConfig {
            window_ms: 60,
            align_ms: 5,
            sample_ms: 5,
            ..ClassificationConfig::default()
        }
    }

    #[test]
    fn decision_order() {
        assert_eq!(decide(2, 5, 2), BoxColor::Blue);
        assert_eq!(decide(1, 2, 2), BoxColor::Green);
        assert_eq!(decide(1, 1, 2), BoxColor::Other);
    }

    #[test]
    fn steady_green_is_green() {
        let (io, classifier) = classifier(fast());
        io.set_sensor(SensorAddr(89), true);
        let result = classifier.classify().unwrap();
        assert_eq!(result.color, BoxColor::Green);
        assert_eq!(result.blue, 0);
        assert!(!io.read_actuator(plant::io::ActuatorAddr(32)).unwrap());
    }

    #[test]
    fn nothing_seen_is_other() {
        let (_io, classifier) = classifier(ClassificationConfig {
            sample_while_running: true,
            ..fast()
        });
        assert_eq!(classifier.classify().unwrap().color, BoxColor::Other);
        assert!(!classifier.is_open());
    }

    #[test]
    fn second_window_is_rejected() {
        let (_io, classifier) = classifier(ClassificationConfig {
            window_ms: 200,
            ..fast()
        });
        let first = {
            let c = Arc::clone(&classifier);
            thread::spawn(move || c.classify())
        };
        let deadline = Instant::now() + Duration::from_secs(1);
        while !classifier.is_open() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(classifier.classify().is_none());
        assert!(first.join().unwrap().is_some());
    }
}
