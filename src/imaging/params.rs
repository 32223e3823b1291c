//! Parameter types for image operations.
//!
//! - [`Brightness`]: Backside brightness adjustment in percent (−100..=100,
//!   default −30). Clamped on construction.
//! - [`Dimensions`]: Width × height of a decoded image or a card cell.

use std::fmt;

/// Brightness adjustment in percent, applied to the backside tile.
///
/// `-100` is black, `0` is unchanged, `100` is white. The shift is applied
/// to each color channel; alpha is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brightness(i32);

impl Brightness {
    pub fn new(percent: i32) -> Self {
        Self(percent.clamp(-100, 100))
    }

    pub fn percent(self) -> i32 {
        self.0
    }

    /// Per-channel shift on the 0–255 scale, rounded half up.
    ///
    /// ```
    /// # use deck_sheets::imaging::Brightness;
    /// assert_eq!(Brightness::new(-30).channel_shift(), -76);
    /// assert_eq!(Brightness::new(30).channel_shift(), 77);
    /// ```
    pub fn channel_shift(self) -> i32 {
        (255.0 * self.0 as f64 / 100.0 + 0.5).floor() as i32
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self(-30)
    }
}

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
