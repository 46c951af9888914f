//! Icon shapes as signed distance fields.
//!
//! Each shape is described by the distance from a pixel center to its
//! boundary (positive inside). Coverage derived from that distance gives an
//! anti-aliased clip mask and border band whose edges land in the same
//! relative place at every target size.

use super::calculations::corner_radius;
use crate::types::{IconShape, Rgb};
use image::{Rgba, RgbaImage};

/// Distance from `(x, y)` to the shape boundary on a `size × size` canvas.
///
/// Positive inside, negative outside. `IconShape::None` is the full canvas
/// rectangle.
pub fn inside_distance(shape: IconShape, size: u32, x: f64, y: f64) -> f64 {
    let s = size as f64;
    let half = s / 2.0;
    match shape {
        IconShape::None => x.min(y).min(s - x).min(s - y),
        IconShape::Circle => half - (x - half).hypot(y - half),
        IconShape::RoundedSquare => {
            let r = corner_radius(size);
            let qx = (x - half).abs() - (half - r);
            let qy = (y - half).abs() - (half - r);
            let outside = qx.max(0.0).hypot(qy.max(0.0)) + qx.max(qy).min(0.0) - r;
            -outside
        }
    }
}

/// Fraction of a pixel covered by the region with `distance > 0`.
#[inline]
pub fn coverage(distance: f64) -> f64 {
    (distance + 0.5).clamp(0.0, 1.0)
}

/// Coverage of the inner band `0 < distance < width`.
#[inline]
pub fn band_coverage(distance: f64, width: f64) -> f64 {
    coverage(distance) * coverage(width - distance)
}

/// Source-over blend of an opaque `color` at `alpha` onto `dst` (straight alpha).
#[inline]
pub(crate) fn blend_over(dst: &mut Rgba<u8>, color: Rgb, alpha: f64) {
    if alpha <= 0.0 {
        return;
    }
    let dst_a = dst.0[3] as f64 / 255.0;
    let out_a = alpha + dst_a * (1.0 - alpha);
    for (i, c) in color.0.iter().enumerate() {
        let v = (*c as f64 * alpha + dst.0[i] as f64 * dst_a * (1.0 - alpha)) / out_a;
        dst.0[i] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Confine the surface to `shape`: alpha outside the shape drops to zero.
pub fn apply_clip(surface: &mut RgbaImage, shape: IconShape) {
    if shape == IconShape::None {
        return;
    }
    let size = surface.width();
    for (x, y, px) in surface.enumerate_pixels_mut() {
        let d = inside_distance(shape, size, x as f64 + 0.5, y as f64 + 0.5);
        let c = coverage(d);
        if c < 1.0 {
            px.0[3] = (px.0[3] as f64 * c).round() as u8;
        }
    }
}

/// Stroke the inside edge of `shape` with a band `width` target pixels wide.
pub fn stroke_border(surface: &mut RgbaImage, shape: IconShape, width: f64, color: Rgb) {
    if width <= 0.0 {
        return;
    }
    let size = surface.width();
    for (x, y, px) in surface.enumerate_pixels_mut() {
        let d = inside_distance(shape, size, x as f64 + 0.5, y as f64 + 0.5);
        blend_over(px, color, band_coverage(d, width));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::solid_image;

    #[test]
    fn rectangle_distance_is_distance_to_nearest_edge() {
        assert_eq!(inside_distance(IconShape::None, 100, 0.5, 50.0), 0.5);
        assert_eq!(inside_distance(IconShape::None, 100, 50.0, 50.0), 50.0);
    }

    #[test]
    fn circle_distance_is_radial() {
        assert_eq!(inside_distance(IconShape::Circle, 100, 50.0, 50.0), 50.0);
        assert_eq!(inside_distance(IconShape::Circle, 100, 50.0, 0.0), 0.0);
        assert!(inside_distance(IconShape::Circle, 100, 0.5, 0.5) < 0.0);
    }

    #[test]
    fn rounded_square_cuts_corners_only() {
        // Edge midpoint is inside, corner pixel is outside.
        assert!(inside_distance(IconShape::RoundedSquare, 100, 50.0, 1.0) > 0.0);
        assert!(inside_distance(IconShape::RoundedSquare, 100, 0.5, 0.5) < 0.0);
        // Straight edge behaves like the rectangle.
        assert!((inside_distance(IconShape::RoundedSquare, 100, 50.0, 3.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn clip_circle_clears_corners_and_keeps_center() {
        let mut img = solid_image(64, 64, [10, 20, 30, 255]);
        apply_clip(&mut img, IconShape::Circle);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(32, 32).0, [10, 20, 30, 255]);
    }

    #[test]
    fn clip_none_is_identity() {
        let mut img = solid_image(8, 8, [1, 2, 3, 200]);
        let before = img.clone();
        apply_clip(&mut img, IconShape::None);
        assert_eq!(img, before);
    }

    #[test]
    fn border_band_covers_edge_pixels_only() {
        let mut img = solid_image(20, 20, [255, 255, 255, 255]);
        stroke_border(&mut img, IconShape::None, 2.0, Rgb::BLACK);
        assert_eq!(img.get_pixel(0, 10).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 10).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(2, 10).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(10, 10).0, [255, 255, 255, 255]);
    }

    #[test]
    fn blend_over_transparent_takes_color() {
        let mut px = Rgba([0, 0, 0, 0]);
        blend_over(&mut px, Rgb([200, 100, 50]), 1.0);
        assert_eq!(px.0, [200, 100, 50, 255]);
    }

    #[test]
    fn blend_half_coverage_mixes() {
        let mut px = Rgba([0, 0, 0, 255]);
        blend_over(&mut px, Rgb::WHITE, 0.5);
        assert_eq!(px.0, [128, 128, 128, 255]);
    }
}
