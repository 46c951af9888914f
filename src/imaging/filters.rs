//! Whole-surface pixel filters.
//!
//! Every filter is a pure function over an [`RgbaImage`]: it reads the
//! surface and writes a new one (or rewrites in place) without touching any
//! other state. Alpha is never changed by the color filters.
//!
//! | Filter | Per-pixel rule |
//! |---|---|
//! | Grayscale | `(r + g + b) / 3`, rounded, on all three channels |
//! | Sepia | standard sepia matrix, rounded and clamped to 255 |
//! | Invert | `255 - c` per color channel |
//! | Blur | delegated to a [`BlurPrimitive`] |
//! | Sharpen | 3×3 kernel `[0,-1,0; -1,5,-1; 0,-1,0]`, export only |
//!
//! Blur is the one filter that depends on a platform capability. It sits
//! behind [`BlurPrimitive`] so a missing implementation degrades to an
//! unblurred render with a logged warning instead of failing.

use crate::types::FilterKind;
use image::RgbaImage;
use tracing::warn;

/// Apply the selected color filter in place.
///
/// `blur_sigma` is already in target pixels.
pub fn apply_filter(
    surface: &mut RgbaImage,
    filter: FilterKind,
    blur: &dyn BlurPrimitive,
    blur_sigma: f32,
) {
    match filter {
        FilterKind::None => {}
        FilterKind::Grayscale => grayscale(surface),
        FilterKind::Sepia => sepia(surface),
        FilterKind::Invert => invert(surface),
        FilterKind::Blur => {
            if let Some(blurred) = blur.blur(surface, blur_sigma) {
                *surface = blurred;
            } else {
                warn!(primitive = blur.name(), "blur unavailable, rendering unblurred");
            }
        }
    }
}

pub fn grayscale(surface: &mut RgbaImage) {
    for px in surface.pixels_mut() {
        let [r, g, b, _] = px.0;
        let sum = r as u32 + g as u32 + b as u32;
        let avg = ((sum + 1) / 3) as u8;
        px.0[0] = avg;
        px.0[1] = avg;
        px.0[2] = avg;
    }
}

pub fn sepia(surface: &mut RgbaImage) {
    for px in surface.pixels_mut() {
        let [r, g, b, _] = px.0;
        let (r, g, b) = (r as f64, g as f64, b as f64);
        let to_u8 = |v: f64| v.round().min(255.0) as u8;
        px.0[0] = to_u8(0.393 * r + 0.769 * g + 0.189 * b);
        px.0[1] = to_u8(0.349 * r + 0.686 * g + 0.168 * b);
        px.0[2] = to_u8(0.272 * r + 0.534 * g + 0.131 * b);
    }
}

pub fn invert(surface: &mut RgbaImage) {
    for px in surface.pixels_mut() {
        px.0[0] = 255 - px.0[0];
        px.0[1] = 255 - px.0[1];
        px.0[2] = 255 - px.0[2];
    }
}

const SHARPEN_KERNEL: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

/// Sharpen color channels with a 3×3 convolution.
///
/// Neighbors outside the surface contribute zero. Alpha is copied through.
pub fn sharpen(surface: &RgbaImage) -> RgbaImage {
    let (w, h) = surface.dimensions();
    let mut out = surface.clone();
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0i32; 3];
            for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
                for (kx, &k) in row.iter().enumerate() {
                    if k == 0 {
                        continue;
                    }
                    let sx = x as i64 + kx as i64 - 1;
                    let sy = y as i64 + ky as i64 - 1;
                    if sx < 0 || sy < 0 || sx >= w as i64 || sy >= h as i64 {
                        continue;
                    }
                    let p = surface.get_pixel(sx as u32, sy as u32).0;
                    for c in 0..3 {
                        acc[c] += k * p[c] as i32;
                    }
                }
            }
            let dst = out.get_pixel_mut(x, y);
            for c in 0..3 {
                dst.0[c] = acc[c].clamp(0, 255) as u8;
            }
        }
    }
    out
}

/// A Gaussian blur implementation the compositor can call.
///
/// Returns `None` when the primitive cannot blur; the caller then renders
/// without blur.
pub trait BlurPrimitive: Send + Sync {
    fn name(&self) -> &'static str;
    fn blur(&self, surface: &RgbaImage, sigma: f32) -> Option<RgbaImage>;
}

/// Gaussian blur from `image::imageops`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageOpsBlur;

impl BlurPrimitive for ImageOpsBlur {
    fn name(&self) -> &'static str {
        "imageops"
    }

    fn blur(&self, surface: &RgbaImage, sigma: f32) -> Option<RgbaImage> {
        if sigma <= 0.0 {
            return Some(surface.clone());
        }
        Some(image::imageops::blur(surface, sigma))
    }
}

/// A primitive that never blurs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBlur;

impl BlurPrimitive for NoBlur {
    fn name(&self) -> &'static str {
        "none"
    }

    fn blur(&self, _surface: &RgbaImage, _sigma: f32) -> Option<RgbaImage> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{max_channel_diff, patterned_image, solid_image};
    use image::Rgba;

    #[test]
    fn grayscale_averages_channels() {
        let mut img = solid_image(1, 1, [30, 60, 91, 200]);
        grayscale(&mut img);
        // (30 + 60 + 91) / 3 = 60.33 → 60
        assert_eq!(img.get_pixel(0, 0).0, [60, 60, 60, 200]);
    }

    #[test]
    fn grayscale_is_idempotent() {
        let mut once = patterned_image(32, 32);
        grayscale(&mut once);
        let mut twice = once.clone();
        grayscale(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn invert_twice_is_identity() {
        let original = patterned_image(17, 9);
        let mut img = original.clone();
        invert(&mut img);
        assert_ne!(img, original);
        invert(&mut img);
        assert_eq!(img, original);
    }

    #[test]
    fn invert_keeps_alpha() {
        let mut img = solid_image(1, 1, [0, 100, 255, 42]);
        invert(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [255, 155, 0, 42]);
    }

    #[test]
    fn sepia_clamps_white() {
        let mut img = solid_image(1, 1, [255, 255, 255, 255]);
        sepia(&mut img);
        // Red and green exceed 255 before clamping; blue = 0.937 * 255
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 239, 255]);
    }

    #[test]
    fn sepia_black_stays_black() {
        let mut img = solid_image(2, 2, [0, 0, 0, 128]);
        sepia(&mut img);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 128]);
    }

    #[test]
    fn sharpen_leaves_flat_interior_unchanged() {
        let img = solid_image(8, 8, [90, 120, 150, 255]);
        let out = sharpen(&img);
        for y in 1..7 {
            for x in 1..7 {
                assert_eq!(out.get_pixel(x, y), img.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn sharpen_edges_see_zero_outside() {
        // Corner pixel has two missing neighbors: 5c - 2c = 3c, clamped
        let img = solid_image(4, 4, [50, 50, 50, 255]);
        let out = sharpen(&img);
        assert_eq!(out.get_pixel(0, 0).0, [150, 150, 150, 255]);
        // Edge pixel has one missing neighbor: 5c - 3c = 2c
        assert_eq!(out.get_pixel(1, 0).0, [100, 100, 100, 255]);
    }

    #[test]
    fn sharpen_boosts_local_contrast() {
        let mut img = solid_image(5, 5, [100, 100, 100, 255]);
        img.put_pixel(2, 2, Rgba([140, 140, 140, 255]));
        let out = sharpen(&img);
        // 5*140 - 4*100 = 300 → 255
        assert_eq!(out.get_pixel(2, 2).0[0], 255);
        // Neighbor: 5*100 - 3*100 - 140 = 60
        assert_eq!(out.get_pixel(2, 1).0[0], 60);
    }

    #[test]
    fn blur_through_imageops_smooths() {
        let img = patterned_image(32, 32);
        let mut blurred = img.clone();
        apply_filter(&mut blurred, FilterKind::Blur, &ImageOpsBlur, 2.0);
        assert!(max_channel_diff(&img, &blurred) > 0);
    }

    #[test]
    fn missing_blur_renders_unblurred() {
        let img = patterned_image(16, 16);
        let mut out = img.clone();
        apply_filter(&mut out, FilterKind::Blur, &NoBlur, 2.0);
        assert_eq!(out, img);
    }

    #[test]
    fn filter_none_is_identity() {
        let img = patterned_image(8, 8);
        let mut out = img.clone();
        apply_filter(&mut out, FilterKind::None, &ImageOpsBlur, 2.0);
        assert_eq!(out, img);
    }
}
