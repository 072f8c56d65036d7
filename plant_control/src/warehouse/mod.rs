//! Warehouse slot allocation.
//!
//! Pure in-memory index of the 9×6 rack. Columns are either dedicated to a
//! client or part of the generic stock pool; searches run column by column
//! in the configured order and bottom-up inside each column. Every
//! operation takes the allocator lock, so concurrent shuttle routines never
//! decide on the same slot.

mod grid;
mod map;

pub use grid::{Grid, Slot, SlotPos, SLOT_COUNT};
pub use map::render_map;

use crate::config::WarehouseConfig;
use parking_lot::Mutex;
use plant::color::BoxColor;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Thread-safe slot allocator.
pub struct WarehouseAllocator {
    clients: BTreeMap<String, u8>,
    stock_columns: Vec<u8>,
    grid: Mutex<Grid>,
}

impl WarehouseAllocator {
    /// Create an empty warehouse with the configured column layout.
    pub fn new(config: &WarehouseConfig) -> Self {
        Self {
            clients: config.clients.clone(),
            stock_columns: config.stock_columns.clone(),
            grid: Mutex::new(Grid::default()),
        }
    }

    /// Occupy the configured initial slots.
    pub fn seed(&self, config: &WarehouseConfig) {
        let mut grid = self.grid.lock();
        for seed in &config.initial_stock {
            let Some(pos) = SlotPos::new(seed.column, seed.row) else {
                warn!(column = seed.column, row = seed.row, "Initial slot outside the grid");
                continue;
            };
            if !grid.occupy(pos, seed.color, seed.owner.as_deref()) {
                warn!(%pos, "Initial slot listed twice");
            }
        }
        info!(occupied = grid.occupied_count(), "Warehouse seeded");
    }

    /// Store `color` at (`column`, `row`).
    ///
    /// Returns `false` if the slot is outside the grid or already occupied;
    /// an occupied slot is never overwritten.
    pub fn occupy(&self, column: u8, row: u8, color: BoxColor, owner: Option<&str>) -> bool {
        let Some(pos) = SlotPos::new(column, row) else {
            warn!(column, row, "Occupy outside the grid");
            return false;
        };
        let ok = self.grid.lock().occupy(pos, color, owner);
        if ok {
            info!(%pos, %color, owner = owner.unwrap_or("-"), "Slot occupied");
        } else {
            warn!(%pos, "Slot already occupied");
        }
        ok
    }

    /// Empty the slot at shuttle `address`.
    ///
    /// Returns `false` for an address outside `1..=54` or an empty slot.
    pub fn free(&self, address: u16) -> bool {
        let Some(pos) = SlotPos::from_address(address) else {
            warn!(address, "Invalid slot address");
            return false;
        };
        let ok = self.grid.lock().free(pos);
        if ok {
            info!(%pos, "Slot freed");
        } else {
            warn!(%pos, "Slot already empty");
        }
        ok
    }

    /// Lowest free row of `column`.
    pub fn find_next_free_in_column(&self, column: u8) -> Option<u8> {
        self.grid.lock().next_free_row(column)
    }

    /// First free stock slot, in stock column order.
    pub fn find_next_free_stock_slot(&self) -> Option<SlotPos> {
        let grid = self.grid.lock();
        let found = self.stock_columns.iter().find_map(|&column| {
            grid.next_free_row(column)
                .and_then(|row| SlotPos::new(column, row))
        });
        if found.is_none() {
            warn!("Stock columns full");
        }
        found
    }

    /// First free slot in the column of `client`.
    pub fn find_next_free_client_slot(&self, client: &str) -> Option<SlotPos> {
        let Some(&column) = self.clients.get(client) else {
            warn!(client, known = ?self.clients.keys().collect::<Vec<_>>(), "Unknown client");
            return None;
        };
        let row = self.grid.lock().next_free_row(column);
        match row {
            Some(row) => {
                let pos = SlotPos::new(column, row);
                debug!(client, ?pos, "Next client slot");
                pos
            }
            None => {
                warn!(client, column, "Client column full");
                None
            }
        }
    }

    /// Address of the first stock slot holding `color`.
    pub fn find_occupied_by_color(&self, color: BoxColor) -> Option<u16> {
        let grid = self.grid.lock();
        for &column in &self.stock_columns {
            for row in 1..=crate::config::GRID_ROWS {
                let Some(pos) = SlotPos::new(column, row) else {
                    continue;
                };
                let slot = grid.slot(pos);
                if slot.occupied && slot.color == Some(color) {
                    debug!(%pos, %color, "Product found");
                    return Some(pos.address());
                }
            }
        }
        debug!(%color, "Product not in stock");
        None
    }

    /// Copy of the slot at `pos`.
    pub fn slot(&self, pos: SlotPos) -> Slot {
        self.grid.lock().slot(pos).clone()
    }

    /// Number of occupied slots.
    pub fn occupied_count(&self) -> usize {
        self.grid.lock().occupied_count()
    }

    /// Client name to column table.
    pub fn clients(&self) -> &BTreeMap<String, u8> {
        &self.clients
    }

    /// Stock columns in search order.
    pub fn stock_columns(&self) -> &[u8] {
        &self.stock_columns
    }

    /// Render the front view of the rack.
    pub fn render(&self) -> String {
        let grid = self.grid.lock();
        render_map(&grid, &self.clients, &self.stock_columns)
    }
}
