//! Image processing on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` (PNG, JPEG, TIFF, WebP, GIF) |
//! | **Identify** | `ImageReader::into_dimensions` (header only) |
//! | **Backside fit** | `resize_exact` with `Lanczos3` |
//! | **Darken** | `DynamicImage::brighten` |
//! | **Compose** | `imageops::replace` onto an RGBA canvas |
//! | **Encode** | `PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for canvas geometry (unit testable)
//! - **Parameters**: [`Brightness`] and [`Dimensions`]
//! - **Operations**: Decode, resize, brightness, PNG encode
//! - **Sheet**: The [`Sheet`] canvas pages are drawn on

mod calculations;
pub mod operations;
mod params;
mod sheet;

pub use calculations::{canvas_dimensions, cell_origin};
pub use operations::{
    ImagingError, adjust_brightness, decode, dimensions_of, fit_to, identify, save_png,
};
pub use params::{Brightness, Dimensions};
pub use sheet::Sheet;
