//! Config loading tests for the shared sections.
//!
//! Applications embed `[shared]`, `[scan]`, `[io]` and `[simulation]` in one
//! file; these tests load such files from disk the way the binaries do.

use plant_common::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
use plant_common::hal::{ScanConfig, SimulationConfig};
use plant_common::io::{ActuatorAddr, IoMap, SensorAddr};
use proptest::prelude::*;
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct CellConfig {
    shared: SharedConfig,
    #[serde(default)]
    scan: ScanConfig,
    #[serde(default)]
    io: IoMap,
    #[serde(default)]
    simulation: SimulationConfig,
}

// ── Helpers ─────────────────────────────────────────────────────────

fn load(content: &str) -> Result<CellConfig, ConfigError> {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plant.toml");
    fs::write(&path, content).unwrap();
    CellConfig::load(&path)
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn minimal_file_uses_defaults() {
    let config = load(
        r#"
[shared]
service_name = "cell-a"
"#,
    )
    .unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Info);
    assert_eq!(config.scan, ScanConfig::default());
    assert_eq!(config.io, IoMap::default());
    assert!(config.simulation.links.is_empty());
    assert!(config.scan.validate(config.io.required_snapshot_len()).is_ok());
}

#[test]
fn overrides_are_applied_per_field() {
    let config = load(
        r#"
[shared]
service_name = "cell-b"
log_level = "debug"

[scan]
period_ms = 20

[io.sensors]
tt2_back_limit = 99

[io.actuators]
light_not_in_store = 50

[simulation]
initial_high = [9]
"#,
    )
    .unwrap();

    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.scan.period_ms, 20);
    assert_eq!(config.scan.snapshot_len, 120);
    assert_eq!(config.io.sensors.tt2_back_limit, Some(SensorAddr(99)));
    assert_eq!(config.io.sensors.tt2_front_limit, None);
    assert_eq!(config.io.actuators.light_not_in_store, ActuatorAddr(50));
    assert_eq!(config.simulation.initial_high, vec![SensorAddr(9)]);
    assert_eq!(config.io.required_snapshot_len(), 100);
}

#[test]
fn missing_shared_section_is_a_parse_error() {
    let result = load("[scan]\nperiod_ms = 20\n");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn snapshot_must_cover_moved_sensor() {
    let config = load(
        r#"
[shared]
service_name = "cell-c"

[io.sensors]
hall = 130
"#,
    )
    .unwrap();

    let result = config.scan.validate(config.io.required_snapshot_len());
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

proptest! {
    #[test]
    fn any_distinct_hall_address_keeps_map_valid(addr in 100u16..400) {
        let mut map = IoMap::default();
        map.sensors.hall = SensorAddr(addr);
        prop_assert!(map.validate().is_ok());
        prop_assert_eq!(map.required_snapshot_len(), addr as usize + 1);
    }
}
