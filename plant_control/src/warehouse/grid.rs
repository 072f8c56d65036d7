//! Slot grid and address encoding.
//!
//! Column 1 is the rightmost column seen from the front, row 1 the bottom
//! row. Slot addresses are what the shuttle target register expects:
//!
//! ```text
//! address = column + 9 * (row - 1)        1 ..= 54
//! column  = (address - 1) % 9 + 1
//! row     = (address - 1) / 9 + 1
//! ```

use crate::config::{GRID_COLUMNS, GRID_ROWS};
use plant::color::BoxColor;
use std::fmt;
use std::time::SystemTime;

/// Number of addressable slots.
pub const SLOT_COUNT: u16 = GRID_COLUMNS as u16 * GRID_ROWS as u16;

/// A (column, row) coordinate inside the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotPos {
    /// Column, 1..=9.
    pub column: u8,
    /// Row, 1..=6 (1 is the bottom row).
    pub row: u8,
}

impl SlotPos {
    /// Build a position, `None` if it lies outside the grid.
    pub fn new(column: u8, row: u8) -> Option<Self> {
        if (1..=GRID_COLUMNS).contains(&column) && (1..=GRID_ROWS).contains(&row) {
            Some(Self { column, row })
        } else {
            None
        }
    }

    /// Shuttle address of this slot.
    pub fn address(self) -> u16 {
        u16::from(self.column) + u16::from(GRID_COLUMNS) * (u16::from(self.row) - 1)
    }

    /// Decode a shuttle address, `None` outside `1..=54`.
    pub fn from_address(address: u16) -> Option<Self> {
        if !(1..=SLOT_COUNT).contains(&address) {
            return None;
        }
        let cols = u16::from(GRID_COLUMNS);
        Some(Self {
            column: ((address - 1) % cols + 1) as u8,
            row: ((address - 1) / cols + 1) as u8,
        })
    }
}

impl fmt::Display for SlotPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "col {} row {} (#{})", self.column, self.row, self.address())
    }
}

/// One storage slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    /// Whether a box is stored here.
    pub occupied: bool,
    /// Stored product.
    pub color: Option<BoxColor>,
    /// When the slot was last occupied.
    pub stored_at: Option<SystemTime>,
    /// Owner recorded when the box was stored.
    pub owner: Option<String>,
}

/// 9×6 slot matrix. Not synchronized; see [`WarehouseAllocator`](super::WarehouseAllocator).
#[derive(Debug, Clone)]
pub struct Grid {
    slots: Vec<Slot>,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            slots: vec![Slot::default(); SLOT_COUNT as usize],
        }
    }
}

impl Grid {
    fn index(pos: SlotPos) -> usize {
        (pos.address() - 1) as usize
    }

    /// Slot at `pos`.
    pub fn slot(&self, pos: SlotPos) -> &Slot {
        &self.slots[Self::index(pos)]
    }

    /// Store a box. Returns `false`, leaving the slot unchanged, if occupied.
    pub fn occupy(&mut self, pos: SlotPos, color: BoxColor, owner: Option<&str>) -> bool {
        let slot = &mut self.slots[Self::index(pos)];
        if slot.occupied {
            return false;
        }
        *slot = Slot {
            occupied: true,
            color: Some(color),
            stored_at: Some(SystemTime::now()),
            owner: owner.map(str::to_string),
        };
        true
    }

    /// Empty a slot. Returns `false` if it was already empty.
    pub fn free(&mut self, pos: SlotPos) -> bool {
        let slot = &mut self.slots[Self::index(pos)];
        if !slot.occupied {
            return false;
        }
        *slot = Slot::default();
        true
    }

    /// Lowest free row of `column`.
    pub fn next_free_row(&self, column: u8) -> Option<u8> {
        (1..=GRID_ROWS).find(|&row| {
            SlotPos::new(column, row).is_some_and(|pos| !self.slot(pos).occupied)
        })
    }

    /// Occupied slot count.
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.occupied).count()
    }
}
