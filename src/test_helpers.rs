//! Shared test utilities for the iconsmith test suite.
//!
//! Provides in-memory fixtures (solid and patterned rasters, encoded PNG
//! bytes) and pixel assertions that compare whole surfaces with a tolerance.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let src = red_square_source();
//! let icon = render_at(&src, &TransformModel::default(), 48);
//! assert_pixel_near(&icon, 24, 24, [255, 0, 0, 255], 2);
//! ```

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use ab_glyph::FontArc;

use crate::imaging::{Compositor, load_system_font};
use crate::model::TransformModel;
use crate::source::{FetchedImage, SourceImage, SourceOrigin};

// =========================================================================
// Fixtures
// =========================================================================

/// A `width × height` raster filled with one color.
pub fn solid_image(width: u32, height: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(rgba))
}

/// Encode a raster as PNG bytes.
pub fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Diagonal gradient with a hard vertical edge, for tests that need texture.
pub fn patterned_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width.max(1)) as u8;
        let g = ((y * 255) / height.max(1)) as u8;
        let b = if x < width / 2 { 40 } else { 220 };
        Rgba([r, g, b, 255])
    })
}

/// A source decoded from in-memory PNG bytes.
pub fn source_from(img: &RgbaImage) -> SourceImage {
    SourceImage::decode(FetchedImage {
        bytes: png_bytes(img),
        origin: SourceOrigin::Memory,
    })
    .unwrap()
}

/// The 200×200 opaque red square used by the export scenarios.
pub fn red_square_source() -> SourceImage {
    source_from(&solid_image(200, 200, [255, 0, 0, 255]))
}

/// Render `model` at `size` with the default compositor and 512px reference.
pub fn render_at(source: &SourceImage, model: &TransformModel, size: u32) -> RgbaImage {
    Compositor::default()
        .render(model, Some(source), size)
        .unwrap()
}

/// The system sans-serif font. Text tests need one installed.
pub fn system_font() -> FontArc {
    load_system_font(None).expect("no sans-serif system font installed")
}

// =========================================================================
// Pixel assertions
// =========================================================================

/// Largest per-channel difference between two rasters of the same size.
pub fn max_channel_diff(a: &RgbaImage, b: &RgbaImage) -> u8 {
    assert_eq!(a.dimensions(), b.dimensions(), "raster sizes differ");
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

/// Mean absolute per-channel difference between two rasters.
pub fn mean_channel_diff(a: &RgbaImage, b: &RgbaImage) -> f64 {
    assert_eq!(a.dimensions(), b.dimensions(), "raster sizes differ");
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| x.abs_diff(*y) as u64)
        .sum();
    total as f64 / a.as_raw().len().max(1) as f64
}

/// Assert one pixel is within `tolerance` of `expected` on every channel.
pub fn assert_pixel_near(img: &RgbaImage, x: u32, y: u32, expected: [u8; 4], tolerance: u8) {
    let actual = img.get_pixel(x, y).0;
    let close = actual
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| a.abs_diff(*e) <= tolerance);
    assert!(
        close,
        "pixel ({x}, {y}) = {actual:?}, expected {expected:?} ± {tolerance}"
    );
}

/// Count pixels whose color is within `tolerance` of `rgb` (alpha ignored).
pub fn count_near(img: &RgbaImage, rgb: [u8; 3], tolerance: u8) -> usize {
    img.pixels()
        .filter(|p| {
            p.0[..3]
                .iter()
                .zip(rgb.iter())
                .all(|(a, e)| a.abs_diff(*e) <= tolerance)
        })
        .count()
}
