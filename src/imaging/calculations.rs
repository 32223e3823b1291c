//! Pure calculation functions for sheet geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::Dimensions;
use crate::grid::GridSize;

/// Size of a sheet holding `grid` cells of `card` size.
///
/// Returns `None` when the canvas would not fit in `u32` pixels.
///
/// ```
/// # use deck_sheets::imaging::{canvas_dimensions, Dimensions};
/// # use deck_sheets::grid::GridSize;
/// let canvas = canvas_dimensions(Dimensions::new(100, 140), GridSize { columns: 3, rows: 2 });
/// assert_eq!(canvas, Some(Dimensions::new(300, 280)));
/// ```
pub fn canvas_dimensions(card: Dimensions, grid: GridSize) -> Option<Dimensions> {
    Some(Dimensions {
        width: card.width.checked_mul(grid.columns)?,
        height: card.height.checked_mul(grid.rows)?,
    })
}

/// Top-left pixel of the cell at `(column, row)`.
pub fn cell_origin(card: Dimensions, column: u32, row: u32) -> (u32, u32) {
    (column * card.width, row * card.height)
}
