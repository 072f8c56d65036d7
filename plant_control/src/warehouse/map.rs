//! Front-view rendering of the rack, logged after every committed change.

use super::grid::{Grid, SlotPos};
use crate::config::{GRID_COLUMNS, GRID_ROWS};
use std::collections::BTreeMap;
use std::fmt::Write;

const CELL: usize = 8;

/// Render the rack as seen from the front: column 9 on the left, column 1
/// on the right, row 6 on top.
pub fn render_map(grid: &Grid, clients: &BTreeMap<String, u8>, stock_columns: &[u8]) -> String {
    let owner_of = |column: u8| -> String {
        if stock_columns.contains(&column) {
            return "stock".to_string();
        }
        clients
            .iter()
            .find(|&(_, &c)| c == column)
            .map(|(name, _)| name.chars().take(CELL - 2).collect())
            .unwrap_or_default()
    };

    let columns: Vec<u8> = (1..=GRID_COLUMNS).rev().collect();
    let width = 8 + columns.len() * (CELL + 1);
    let mut out = String::new();

    let _ = writeln!(out, "{}", "=".repeat(width));
    let _ = write!(out, "{:>7} |", "");
    for &c in &columns {
        let _ = write!(out, "{:^CELL$}|", format!("col {c}"));
    }
    out.push('\n');
    let _ = write!(out, "{:>7} |", "");
    for &c in &columns {
        let _ = write!(out, "{:^CELL$}|", owner_of(c));
    }
    out.push('\n');
    let _ = writeln!(out, "{}", "-".repeat(width));

    for row in (1..=GRID_ROWS).rev() {
        let _ = write!(out, "{:>7} |", format!("row {row}"));
        for &column in &columns {
            let symbol = SlotPos::new(column, row)
                .map(|pos| grid.slot(pos))
                .and_then(|slot| slot.color.filter(|_| slot.occupied))
                .map(|color| color.symbol())
                .unwrap_or(' ');
            let _ = write!(out, "{:^CELL$}|", format!("[{symbol}]"));
        }
        out.push('\n');
    }

    let _ = writeln!(out, "{}", "-".repeat(width));
    let _ = writeln!(out, "[B] blue  [G] green  [O] other  [ ] empty");
    for (name, column) in clients {
        let _ = writeln!(out, "  {name} = column {column}");
    }
    let _ = write!(out, "  stock = columns {stock_columns:?}");
    out
}
