//! Controller configuration.
//!
//! One TOML file holds every section. Only `[shared]` is required; every
//! other section falls back to the timings and addresses of the sorting cell.
//!
//! ```toml
//! [shared]
//! service_name = "sorting-cell"
//! log_level = "info"
//!
//! [scan]
//! period_ms = 50
//!
//! [turntable]
//! guard_timeout_s = 10.0
//! debounce = 2
//!
//! [arrival.other]
//! turn = true
//! belt = "backward"
//! stop_limit = "front"
//! belt_timeout_s = 3.0
//! feed_delay_s = 1.0
//! return_s = 8.0
//! exit_timeout_s = 100.0
//!
//! [warehouse.clients]
//! rafael_ltda = 1
//! maria_sa = 2
//!
//! [orders]
//! store_path = "orders.json"
//! ```

use crate::turntable::{BeltDirection, Limit};
use plant::color::BoxColor;
use plant::config::{check_seconds, seconds, ConfigError, SharedConfig};
use plant::hal::{ScanConfig, SimulationConfig};
use plant::io::IoMap;
use plant::store::DEFAULT_CLIENTS;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// Number of warehouse columns.
pub const GRID_COLUMNS: u8 = 9;
/// Number of warehouse rows.
pub const GRID_ROWS: u8 = 6;

fn check_nonzero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ValidationError(format!("{field} must be > 0")));
    }
    Ok(())
}

// ─── Turntable ──────────────────────────────────────────────────────

/// Guard and belt watcher timings shared by both turntables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TurntableConfig {
    /// How long a command waits for the table to become idle.
    pub guard_timeout_s: f64,
    /// Delay before the watcher samples its baseline.
    pub grace_s: f64,
    /// Limit sensor poll interval.
    pub poll_ms: u64,
    /// Consecutive true polls required to accept the limit.
    pub debounce: u32,
    /// Minimum belt-on time, measured from motion start.
    pub min_on_s: f64,
}

impl Default for TurntableConfig {
    fn default() -> Self {
        Self {
            guard_timeout_s: 10.0,
            grace_s: 0.2,
            poll_ms: 20,
            debounce: 2,
            min_on_s: 0.3,
        }
    }
}

impl TurntableConfig {
    /// Guard wait as a `Duration`.
    pub fn guard_timeout(&self) -> Duration {
        seconds(self.guard_timeout_s)
    }

    /// Watcher grace period.
    pub fn grace(&self) -> Duration {
        seconds(self.grace_s)
    }

    /// Watcher poll interval.
    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    /// Minimum belt-on time.
    pub fn min_on(&self) -> Duration {
        seconds(self.min_on_s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_seconds("turntable.guard_timeout_s", self.guard_timeout_s)?;
        check_seconds("turntable.grace_s", self.grace_s)?;
        check_seconds("turntable.min_on_s", self.min_on_s)?;
        check_nonzero("turntable.poll_ms", self.poll_ms)?;
        check_nonzero("turntable.debounce", self.debounce as u64)
    }
}

// ─── Arrival ────────────────────────────────────────────────────────

/// Turntable-1 motion for boxes arriving from one infeed line.
///
/// A color table, when present, is given in full; `turn` and `stop_limit`
/// may be omitted to mean "leave as is" and "no watcher". `return_s` and
/// `exit_timeout_s` fall back to 8 s and 100 s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArrivalPolicy {
    /// Rotation request (`None` keeps the current rotation).
    #[serde(default)]
    pub turn: Option<bool>,
    /// Internal belt direction used to take the box in.
    pub belt: BeltDirection,
    /// Limit that stops the belt.
    #[serde(default)]
    pub stop_limit: Option<Limit>,
    /// Belt watcher fail-safe timeout.
    pub belt_timeout_s: f64,
    /// Delay before the originating line is released again.
    pub feed_delay_s: f64,
    /// Time the table needs to return to center after the limit.
    #[serde(default = "default_return_s")]
    pub return_s: f64,
    /// Deadline for the box to reach the end of the production conveyor.
    #[serde(default = "default_exit_timeout_s")]
    pub exit_timeout_s: f64,
}

fn default_return_s() -> f64 {
    8.0
}

fn default_exit_timeout_s() -> f64 {
    100.0
}

impl ArrivalPolicy {
    fn validate(&self, color: &str) -> Result<(), ConfigError> {
        for (field, value) in [
            ("belt_timeout_s", self.belt_timeout_s),
            ("feed_delay_s", self.feed_delay_s),
            ("return_s", self.return_s),
            ("exit_timeout_s", self.exit_timeout_s),
        ] {
            check_seconds(&format!("arrival.{color}.{field}"), value)?;
        }
        Ok(())
    }
}

/// Turntable-1 arrival handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArrivalConfig {
    /// Policy for the blue line.
    pub blue: ArrivalPolicy,
    /// Policy for the green line.
    pub green: ArrivalPolicy,
    /// Policy for the other/empty line.
    pub other: ArrivalPolicy,
    /// How long the post-limit phase waits for the watcher to start.
    pub watcher_start_s: f64,
    /// How long the post-limit phase waits for the watcher to finish.
    pub watcher_finish_s: f64,
    /// Extra time, beyond the belt timeout, the worker waits for the watcher.
    pub clear_margin_s: f64,
    /// Pause between two arrival jobs.
    pub settle_ms: u64,
    /// Belt direction that discharges towards production.
    pub discharge_belt: BeltDirection,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            blue: ArrivalPolicy {
                turn: None,
                belt: BeltDirection::Forward,
                stop_limit: Some(Limit::Back),
                belt_timeout_s: 3.0,
                feed_delay_s: 0.8,
                return_s: default_return_s(),
                exit_timeout_s: default_exit_timeout_s(),
            },
            green: ArrivalPolicy {
                turn: Some(true),
                belt: BeltDirection::Forward,
                stop_limit: Some(Limit::Back),
                belt_timeout_s: 3.0,
                feed_delay_s: 1.0,
                return_s: default_return_s(),
                exit_timeout_s: default_exit_timeout_s(),
            },
            other: ArrivalPolicy {
                turn: Some(true),
                belt: BeltDirection::Backward,
                stop_limit: Some(Limit::Front),
                belt_timeout_s: 3.0,
                feed_delay_s: 1.0,
                return_s: default_return_s(),
                exit_timeout_s: default_exit_timeout_s(),
            },
            watcher_start_s: 1.0,
            watcher_finish_s: 12.0,
            clear_margin_s: 0.7,
            settle_ms: 50,
            discharge_belt: BeltDirection::Forward,
        }
    }
}

impl ArrivalConfig {
    /// Policy for boxes of `color`.
    pub fn policy(&self, color: BoxColor) -> &ArrivalPolicy {
        match color {
            BoxColor::Blue => &self.blue,
            BoxColor::Green => &self.green,
            BoxColor::Other => &self.other,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.blue.validate("blue")?;
        self.green.validate("green")?;
        self.other.validate("other")?;
        for (field, value) in [
            ("arrival.watcher_start_s", self.watcher_start_s),
            ("arrival.watcher_finish_s", self.watcher_finish_s),
            ("arrival.clear_margin_s", self.clear_margin_s),
        ] {
            check_seconds(field, value)?;
        }
        if self.discharge_belt == BeltDirection::Stop {
            return Err(ConfigError::ValidationError(
                "arrival.discharge_belt must be forward or backward".to_string(),
            ));
        }
        Ok(())
    }
}

// ─── Classification ─────────────────────────────────────────────────

/// Vision classification window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    /// Sampling window length.
    pub window_ms: u64,
    /// Samples a color needs to win.
    pub debounce: u32,
    /// Conveyor run time before sampling, to center the box under the camera.
    pub align_ms: u64,
    /// Interval between two samples.
    pub sample_ms: u64,
    /// Sample with the conveyor still moving, then stop it.
    pub sample_while_running: bool,
    /// Pause after stopping the conveyor, before the window opens.
    pub pause_ms: u64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            window_ms: 700,
            debounce: 2,
            align_ms: 180,
            sample_ms: 10,
            sample_while_running: false,
            pause_ms: 50,
        }
    }
}

impl ClassificationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        check_nonzero("classification.window_ms", self.window_ms)?;
        check_nonzero("classification.sample_ms", self.sample_ms)?;
        check_nonzero("classification.debounce", self.debounce as u64)
    }
}

// ─── Turntable 2 ────────────────────────────────────────────────────

/// Turntable-2 cycle timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Tt2Config {
    /// Rotation time before discharging to production.
    pub turn_s: f64,
    /// Rotation time back to the load position.
    pub return_s: f64,
    /// Deadline for the box to reach the discharge sensor.
    pub entry_timeout_s: f64,
    /// Deadline for the box to reach the end of production.
    pub exit_timeout_s: f64,
    /// Deadline for the discharge sensor to pulse during order delivery.
    pub order_timeout_s: f64,
    /// Sensor poll interval.
    pub poll_ms: u64,
}

impl Default for Tt2Config {
    fn default() -> Self {
        Self {
            turn_s: 1.6,
            return_s: 1.6,
            entry_timeout_s: 6.0,
            exit_timeout_s: 6.0,
            order_timeout_s: 3.0,
            poll_ms: 20,
        }
    }
}

impl Tt2Config {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tt2.turn_s", self.turn_s),
            ("tt2.return_s", self.return_s),
            ("tt2.entry_timeout_s", self.entry_timeout_s),
            ("tt2.exit_timeout_s", self.exit_timeout_s),
            ("tt2.order_timeout_s", self.order_timeout_s),
        ] {
            check_seconds(field, value)?;
        }
        check_nonzero("tt2.poll_ms", self.poll_ms)
    }
}

// ─── Shuttle ────────────────────────────────────────────────────────

/// Shuttle positions and dwell timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShuttleConfig {
    /// Pickup position for boxes going to stock.
    pub stock_pickup: i16,
    /// Pickup position for boxes going to a client column.
    pub client_pickup: i16,
    /// Parking position.
    pub home: i16,
    /// Drop-off position for retrieved boxes.
    pub drop_off: i16,
    /// Settle time after the first move of a routine.
    pub first_move_settle_s: f64,
    /// Settle time after every other move.
    pub move_settle_s: f64,
    /// Fork extend and lift time.
    pub fork_s: f64,
    /// Fork retract time.
    pub retract_s: f64,
    /// How long the "not in store" light stays on.
    pub not_in_store_s: f64,
    /// Deadline for the moving sensor to clear.
    pub move_timeout_s: f64,
    /// Moving sensor poll interval.
    pub poll_ms: u64,
}

impl Default for ShuttleConfig {
    fn default() -> Self {
        Self {
            stock_pickup: 8,
            client_pickup: 1,
            home: 300,
            drop_off: 8,
            first_move_settle_s: 2.0,
            move_settle_s: 1.0,
            fork_s: 2.0,
            retract_s: 1.0,
            not_in_store_s: 3.0,
            move_timeout_s: 30.0,
            poll_ms: 100,
        }
    }
}

impl ShuttleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("shuttle.first_move_settle_s", self.first_move_settle_s),
            ("shuttle.move_settle_s", self.move_settle_s),
            ("shuttle.fork_s", self.fork_s),
            ("shuttle.retract_s", self.retract_s),
            ("shuttle.not_in_store_s", self.not_in_store_s),
            ("shuttle.move_timeout_s", self.move_timeout_s),
        ] {
            check_seconds(field, value)?;
        }
        check_nonzero("shuttle.poll_ms", self.poll_ms)
    }
}

// ─── Warehouse ──────────────────────────────────────────────────────

/// A slot occupied at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlotSeed {
    /// Column, 1..=9.
    pub column: u8,
    /// Row, 1..=6.
    pub row: u8,
    /// Stored product.
    pub color: BoxColor,
    /// Owner recorded with the slot.
    #[serde(default)]
    pub owner: Option<String>,
}

/// Warehouse layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarehouseConfig {
    /// Client name to dedicated column.
    pub clients: BTreeMap<String, u8>,
    /// Generic stock columns, in search order.
    pub stock_columns: Vec<u8>,
    /// Slots occupied at startup.
    pub initial_stock: Vec<SlotSeed>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let clients = DEFAULT_CLIENTS
            .iter()
            .zip(1u8..)
            .map(|(name, col)| (name.to_string(), col))
            .collect();
        let initial_stock = [(1, 2), (2, 2), (9, 1), (9, 2), (8, 2), (9, 4)]
            .into_iter()
            .map(|(column, row)| SlotSeed {
                column,
                row,
                color: BoxColor::Blue,
                owner: None,
            })
            .collect();
        Self {
            clients,
            stock_columns: vec![5, 6, 7, 8, 9],
            initial_stock,
        }
    }
}

impl WarehouseConfig {
    /// Known client names.
    pub fn client_names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let in_grid = |c: u8| (1..=GRID_COLUMNS).contains(&c);
        let mut used = HashSet::new();
        for (name, &col) in &self.clients {
            if !in_grid(col) {
                return Err(ConfigError::ValidationError(format!(
                    "warehouse.clients.{name} column {col} outside 1..={GRID_COLUMNS}"
                )));
            }
            if !used.insert(col) {
                return Err(ConfigError::ValidationError(format!(
                    "warehouse column {col} assigned twice"
                )));
            }
        }
        if self.stock_columns.is_empty() {
            return Err(ConfigError::ValidationError(
                "warehouse.stock_columns cannot be empty".to_string(),
            ));
        }
        for &col in &self.stock_columns {
            if !in_grid(col) {
                return Err(ConfigError::ValidationError(format!(
                    "warehouse.stock_columns entry {col} outside 1..={GRID_COLUMNS}"
                )));
            }
            if !used.insert(col) {
                return Err(ConfigError::ValidationError(format!(
                    "warehouse column {col} assigned twice"
                )));
            }
        }
        for seed in &self.initial_stock {
            if !in_grid(seed.column) || !(1..=GRID_ROWS).contains(&seed.row) {
                return Err(ConfigError::ValidationError(format!(
                    "warehouse.initial_stock slot ({}, {}) outside the grid",
                    seed.column, seed.row
                )));
            }
        }
        Ok(())
    }
}

// ─── Orders ─────────────────────────────────────────────────────────

/// Order persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrdersConfig {
    /// JSON order store; orders live in memory only when unset.
    pub store_path: Option<PathBuf>,
}

// ─── Plant ──────────────────────────────────────────────────────────

/// Complete controller configuration (`plant.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlantConfig {
    /// Logging and instance name.
    pub shared: SharedConfig,
    /// Scan loop.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Address map.
    #[serde(default)]
    pub io: IoMap,
    /// Turntable guard and watcher.
    #[serde(default)]
    pub turntable: TurntableConfig,
    /// Turntable-1 arrival handling.
    #[serde(default)]
    pub arrival: ArrivalConfig,
    /// Vision classification.
    #[serde(default)]
    pub classification: ClassificationConfig,
    /// Turntable-2 cycles.
    #[serde(default)]
    pub tt2: Tt2Config,
    /// Shuttle routines.
    #[serde(default)]
    pub shuttle: ShuttleConfig,
    /// Warehouse layout.
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    /// Order persistence.
    #[serde(default)]
    pub orders: OrdersConfig,
    /// Simulation driver behaviour.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl PlantConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::ValidationError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.io.validate()?;
        self.scan.validate(self.io.required_snapshot_len())?;
        self.turntable.validate()?;
        self.arrival.validate()?;
        self.classification.validate()?;
        self.tt2.validate()?;
        self.shuttle.validate()?;
        self.warehouse.validate()?;
        self.simulation.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plant::config::ConfigLoader;

    #[test]
    fn minimal_config_is_valid() {
        let config = PlantConfig::from_toml("[shared]\nservice_name = \"cell\"\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.arrival.policy(BoxColor::Other).belt, BeltDirection::Backward);
        assert_eq!(config.arrival.policy(BoxColor::Blue).turn, None);
        assert_eq!(config.warehouse.clients["maria_sa"], 2);
        assert_eq!(config.warehouse.initial_stock.len(), 6);
    }

    #[test]
    fn arrival_color_table_replaces_policy() {
        let config = PlantConfig::from_toml(
            r#"
[shared]
service_name = "cell"

[arrival.green]
belt = "backward"
stop_limit = "front"
belt_timeout_s = 2.0
feed_delay_s = 0.5
"#,
        )
        .unwrap();
        let green = config.arrival.policy(BoxColor::Green);
        assert_eq!(green.turn, None);
        assert_eq!(green.stop_limit, Some(Limit::Front));
        assert_eq!(green.return_s, 8.0);
        assert_eq!(green.exit_timeout_s, 100.0);
        assert_eq!(config.arrival.blue, ArrivalConfig::default().blue);
    }

    #[test]
    fn rejects_negative_timing() {
        let mut config = PlantConfig::default();
        config.turntable.min_on_s = -0.1;
        assert!(config.validate().is_err());

        let mut config = PlantConfig::default();
        config.classification.debounce = 0;
        assert!(config.validate().is_err());

        let mut config = PlantConfig::default();
        config.arrival.other.exit_timeout_s = -1.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("arrival.other.exit_timeout_s"));
    }

    #[test]
    fn rejects_overlapping_columns() {
        let mut config = PlantConfig::default();
        config.warehouse.stock_columns.push(2);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("column 2"));

        let mut config = PlantConfig::default();
        config.warehouse.clients.insert("x".to_string(), 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_seed_outside_grid() {
        let mut config = PlantConfig::default();
        config.warehouse.initial_stock.push(SlotSeed {
            column: 5,
            row: 7,
            color: BoxColor::Green,
            owner: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = PlantConfig::from_toml(include_str!("../../config/plant.toml")).unwrap();
        assert!(config.validate().is_ok());
        let defaults = PlantConfig::default();
        assert_eq!(config.turntable, defaults.turntable);
        assert_eq!(config.arrival, defaults.arrival);
        assert_eq!(config.classification, defaults.classification);
        assert_eq!(config.tt2, defaults.tt2);
        assert_eq!(config.shuttle, defaults.shuttle);
        assert_eq!(config.warehouse, defaults.warehouse);
        assert_eq!(config.simulation.links.len(), 4);
    }
}
