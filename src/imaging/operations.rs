//! Pixel-level image operations.
//!
//! Decoding works on in-memory bytes as returned by the catalog; the
//! `context` argument names the source (a card reference, a backside path) so
//! that errors point at the offending entity.

use super::params::{Brightness, Dimensions};
use crate::grid::GridSize;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        source: image::ImageError,
    },
    #[error("{context} is {actual}, expected {expected} like the first card on the page")]
    SizeMismatch {
        context: String,
        expected: Dimensions,
        actual: Dimensions,
    },
    #[error("Sheet of {grid} cards at {card} exceeds the maximum image size")]
    CanvasTooLarge { card: Dimensions, grid: GridSize },
    #[error("Failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Decode an image of any compiled-in format.
pub fn decode(bytes: &[u8], context: &str) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|source| ImagingError::Decode {
        context: context.to_string(),
        source,
    })
}

/// Read dimensions from the image header without decoding pixels.
pub fn identify(bytes: &[u8], context: &str) -> Result<Dimensions> {
    let decode_err = |source| ImagingError::Decode {
        context: context.to_string(),
        source,
    };
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(image::ImageError::IoError(e)))?
        .into_dimensions()
        .map_err(decode_err)?;
    Ok(Dimensions { width, height })
}

pub fn dimensions_of(img: &DynamicImage) -> Dimensions {
    let (width, height) = img.dimensions();
    Dimensions { width, height }
}

/// Shift every color channel by the brightness percentage. Alpha is kept.
pub fn adjust_brightness(img: &DynamicImage, brightness: Brightness) -> DynamicImage {
    match brightness.channel_shift() {
        0 => img.clone(),
        shift => img.brighten(shift),
    }
}

/// Scale to exactly `size` with a Lanczos3 filter; aspect ratio is not kept.
pub fn fit_to(img: &DynamicImage, size: Dimensions) -> DynamicImage {
    if dimensions_of(img) == size {
        return img.clone();
    }
    img.resize_exact(size.width, size.height, FilterType::Lanczos3)
}

/// Encode RGBA pixels as PNG.
pub fn encode_png(img: &RgbaImage, path: &Path) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|source| ImagingError::Encode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(buf)
}

/// Encode as PNG and write to `path`.
pub fn save_png(img: &RgbaImage, path: &Path) -> Result<()> {
    let bytes = encode_png(img, path)?;
    std::fs::write(path, bytes).map_err(|source| ImagingError::Io {
        path: path.to_path_buf(),
        source,
    })
}
