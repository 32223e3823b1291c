//! The sheet canvas: one page of cards laid out on a grid.
//!
//! ```text
//! ┌──────┬──────┬──────┐
//! │  0   │  1   │  2   │   cards fill row-major from the top-left,
//! ├──────┼──────┼──────┤   the bottom-right cell holds the backside
//! │  3   │      │ back │
//! └──────┴──────┴──────┘
//! ```
//!
//! Cells are written with replace semantics: the card's pixels, alpha
//! included, overwrite the transparent canvas.

use super::calculations::{canvas_dimensions, cell_origin};
use super::operations::{ImagingError, Result, dimensions_of, save_png};
use super::params::Dimensions;
use crate::grid::{GridSize, cell_position};
use image::{DynamicImage, RgbaImage, imageops};
use std::path::Path;

pub struct Sheet {
    canvas: RgbaImage,
    card: Dimensions,
    grid: GridSize,
}

impl Sheet {
    /// Transparent canvas of `grid` cells, each `card` sized.
    pub fn new(card: Dimensions, grid: GridSize) -> Result<Self> {
        let size =
            canvas_dimensions(card, grid).ok_or(ImagingError::CanvasTooLarge { card, grid })?;
        Ok(Self {
            canvas: RgbaImage::new(size.width, size.height),
            card,
            grid,
        })
    }

    /// Draw the `index`-th card of the page. The image must be card sized.
    pub fn draw_card(&mut self, index: u32, img: &DynamicImage, context: &str) -> Result<()> {
        let actual = dimensions_of(img);
        if actual != self.card {
            return Err(ImagingError::SizeMismatch {
                context: context.to_string(),
                expected: self.card,
                actual,
            });
        }
        let (column, row) = cell_position(index, self.grid.columns);
        self.draw_at(column, row, img);
        Ok(())
    }

    /// Draw a prepared backside tile into the bottom-right cell.
    pub fn draw_backside(&mut self, img: &DynamicImage) {
        let (column, row) = self.grid.backside_cell();
        self.draw_at(column, row, img);
    }

    fn draw_at(&mut self, column: u32, row: u32, img: &DynamicImage) {
        let (x, y) = cell_origin(self.card, column, row);
        imageops::replace(&mut self.canvas, &img.to_rgba8(), x as i64, y as i64);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_png(&self.canvas, path)
    }
}
