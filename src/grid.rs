//! Grid sizing for sheet pages.
//!
//! Every page is a uniform grid of card cells. The solver picks the smallest
//! grid (by total cell count) that holds the requested number of cells while
//! staying within the configured column and row bounds. Callers pass
//! `cards_on_page + 1` because the bottom-right cell is reserved for the
//! darkened backside tile.
//!
//! All functions here are pure and testable without any I/O or images.

use serde::{Deserialize, Serialize};

/// Inclusive column/row bounds for a sheet grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridBounds {
    pub min_columns: u32,
    pub max_columns: u32,
    pub min_rows: u32,
    pub max_rows: u32,
}

impl GridBounds {
    /// Largest number of cells a page can have.
    pub fn max_cells(&self) -> u32 {
        self.max_columns * self.max_rows
    }
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            min_columns: 2,
            max_columns: 10,
            min_rows: 2,
            max_rows: 7,
        }
    }
}

/// Columns × rows of a sheet page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub columns: u32,
    pub rows: u32,
}

impl GridSize {
    pub fn cells(&self) -> u32 {
        self.columns * self.rows
    }

    /// Cell holding the backside tile (bottom-right).
    pub fn backside_cell(&self) -> (u32, u32) {
        (self.columns - 1, self.rows - 1)
    }
}

impl std::fmt::Display for GridSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.columns, self.rows)
    }
}

/// Find the smallest grid within `bounds` holding at least `cells` cells.
///
/// Candidates are visited rows-ascending then columns-ascending, and a
/// candidate only replaces the current best when it is strictly smaller, so
/// ties go to the first one found. When nothing within bounds is large enough
/// the maximum grid is returned; that is a soft overflow, callers keep pages
/// at most `max_cells() - 1` cards long.
///
/// ```
/// # use deck_sheets::grid::{solve_grid, GridBounds, GridSize};
/// let bounds = GridBounds::default();
/// assert_eq!(solve_grid(4, &bounds), GridSize { columns: 2, rows: 2 });
/// assert_eq!(solve_grid(70, &bounds), GridSize { columns: 10, rows: 7 });
/// ```
pub fn solve_grid(cells: u32, bounds: &GridBounds) -> GridSize {
    let mut best = GridSize {
        columns: bounds.max_columns,
        rows: bounds.max_rows,
    };
    let mut best_cells = best.cells();

    for rows in bounds.min_rows..=bounds.max_rows {
        for columns in bounds.min_columns..=bounds.max_columns {
            let possible = columns * rows;
            if possible < best_cells && possible >= cells {
                best_cells = possible;
                best = GridSize { columns, rows };
            }
        }
    }
    best
}

/// Row-major cell of the `index`-th card on a page with `columns` columns.
///
/// Returns `(column, row)`.
pub fn cell_position(index: u32, columns: u32) -> (u32, u32) {
    (index % columns, index / columns)
}
