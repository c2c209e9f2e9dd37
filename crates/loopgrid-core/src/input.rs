//! Pointer to cell resolution.
//!
//! A pointer only selects a cell when it sits in the middle 60 % of the cell
//! in both axes. The margin keeps a drag that grazes a corner from picking up
//! the neighbouring cell.

use crate::grid::Position;

/// Fraction of a cell's span ignored on each side
pub const DEADZONE: f32 = 0.2;

/// Size of one cell in pointer units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub width: f32,
    pub height: f32,
}

impl CellMetrics {
    pub fn square(size: f32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
}

fn resolve_axis(offset: f32, span: f32, cells: usize) -> Option<usize> {
    if offset < 0.0 || span <= 0.0 {
        return None;
    }
    let index = (offset / span).floor() as usize;
    let frac = (offset % span) / span;
    (index < cells && frac > DEADZONE && frac < 1.0 - DEADZONE).then_some(index)
}

/// Resolve a pointer offset (relative to the board's top-left corner) to a
/// cell, or `None` when it falls in a dead zone or off the board.
pub fn resolve_point(px: f32, py: f32, metrics: CellMetrics, grid_size: usize) -> Option<Position> {
    let x = resolve_axis(px, metrics.width, grid_size)?;
    let y = resolve_axis(py, metrics.height, grid_size)?;
    Some(Position::new(x, y))
}
