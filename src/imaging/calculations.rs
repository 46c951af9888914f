//! Pure geometry for the compositor.
//!
//! All functions here are pure and testable without any pixels. Every
//! quantity the model stores in reference-canvas pixels is multiplied by the
//! same `scale_factor = target / reference` before it reaches a target
//! surface, which is what makes a 48px export a faithful miniature of the
//! 512px preview.

use crate::model::TransformModel;
use crate::types::TextOverlay;

/// Corner radius of the rounded-square shape as a fraction of the target size.
pub const ROUNDED_CORNER_RATIO: f64 = 0.15;

/// Ratio of a target surface to the reference canvas.
pub fn scale_factor(target_size: u32, reference_size: u32) -> f64 {
    target_size as f64 / reference_size as f64
}

/// Side length left for the image once padding and border are subtracted.
///
/// `padding` and `border_width` are reference pixels. The result is in target
/// pixels and may be zero or negative.
pub fn drawable_area(target_size: u32, padding: f64, border_width: f64, scale_factor: f64) -> f64 {
    target_size as f64 - 2.0 * (padding + border_width) * scale_factor
}

/// Corner radius of the rounded-square clip at a given target size.
pub fn corner_radius(target_size: u32) -> f64 {
    target_size as f64 * ROUNDED_CORNER_RATIO
}

/// Where and how large the source image lands on one target surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub target_size: u32,
    pub scale_factor: f64,
    /// Drawable side length in target pixels (may be ≤ 0).
    pub drawable_area: f64,
    /// Border stroke width in target pixels.
    pub border_width: f64,
    /// Image center in target pixel coordinates.
    pub center: (f64, f64),
    /// Drawn image width and height in target pixels, before rotation.
    pub drawn_size: (f64, f64),
    /// Rotation in radians, clockwise.
    pub rotation: f64,
}

impl Layout {
    /// False when padding/border leave no room or the image collapses to nothing.
    pub fn image_visible(&self) -> bool {
        self.drawable_area > 0.0 && self.drawn_size.0 > 0.0 && self.drawn_size.1 > 0.0
    }
}

/// Compute the layout of `model` on a `target_size` square surface.
///
/// The user's `scale` composes multiplicatively with the area-fit factor
/// `drawable_area / reference_size`; offsets scale with `scale_factor`.
pub fn plan_layout(
    model: &TransformModel,
    source_dims: Option<(u32, u32)>,
    target_size: u32,
    reference_size: u32,
) -> Layout {
    let sf = scale_factor(target_size, reference_size);
    let padding = model.padding.resolve(reference_size);
    let area = drawable_area(target_size, padding, model.border_width, sf);

    let half = target_size as f64 / 2.0;
    let center = (half + model.x_offset * sf, half + model.y_offset * sf);

    let drawn_size = match source_dims {
        Some((w, h)) if area > 0.0 => {
            let fit = area / reference_size as f64;
            (w as f64 * model.scale * fit, h as f64 * model.scale * fit)
        }
        _ => (0.0, 0.0),
    };

    Layout {
        target_size,
        scale_factor: sf,
        drawable_area: area,
        border_width: model.border_width * sf,
        center,
        drawn_size,
        rotation: model.rotation.to_radians(),
    }
}

/// Center point of the text overlay on a target surface.
pub fn text_anchor(text: &TextOverlay, target_size: u32, scale_factor: f64) -> (f64, f64) {
    let half = target_size as f64 / 2.0;
    (
        half + text.x_offset * scale_factor,
        half + text.y_offset * scale_factor,
    )
}

/// Pixel dimensions to pre-resample the source to before the affine warp.
///
/// Returns `None` when the drawn size is not smaller than the source on
/// either axis; bilinear sampling handles upscaling on its own, while large
/// reductions need a proper low-pass resize first to avoid aliasing.
pub fn prefilter_dimensions(source: (u32, u32), drawn: (f64, f64)) -> Option<(u32, u32)> {
    let (sw, sh) = source;
    let (dw, dh) = drawn;
    if dw >= sw as f64 && dh >= sh as f64 {
        return None;
    }
    let w = (dw.round() as u32).clamp(1, sw.max(1));
    let h = (dh.round() as u32).clamp(1, sh.max(1));
    if (w, h) == (sw, sh) { None } else { Some((w, h)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Edit;
    use crate::types::Padding;

    #[test]
    fn scale_factor_is_target_over_reference() {
        assert_eq!(scale_factor(512, 512), 1.0);
        assert_eq!(scale_factor(48, 512), 0.09375);
        assert_eq!(scale_factor(1024, 512), 2.0);
    }

    #[test]
    fn drawable_area_subtracts_padding_and_border_on_both_sides() {
        assert_eq!(drawable_area(512, 20.0, 6.0, 1.0), 460.0);
        // Same logical inset at 48px
        assert_eq!(drawable_area(48, 20.0, 6.0, 48.0 / 512.0), 460.0 * 48.0 / 512.0);
    }

    #[test]
    fn drawable_area_can_go_negative() {
        assert!(drawable_area(512, 256.0, 256.0, 1.0) < 0.0);
    }

    #[test]
    fn layout_at_reference_size_uses_raw_values() {
        let model = TransformModel::default()
            .apply(&Edit::Offset { x: 10.0, y: -20.0 })
            .apply(&Edit::Scale(0.5));
        let layout = plan_layout(&model, Some((200, 100)), 512, 512);

        assert_eq!(layout.scale_factor, 1.0);
        assert_eq!(layout.center, (266.0, 236.0));
        assert_eq!(layout.drawn_size, (100.0, 50.0));
        assert!(layout.image_visible());
    }

    #[test]
    fn layout_rescales_every_geometric_quantity() {
        let model = TransformModel::default()
            .apply(&Edit::Offset { x: 64.0, y: 32.0 })
            .apply(&Edit::Padding(Padding::px(16.0)))
            .apply(&Edit::BorderWidth(8.0));
        let big = plan_layout(&model, Some((256, 256)), 512, 512);
        let small = plan_layout(&model, Some((256, 256)), 128, 512);

        let k = 128.0 / 512.0;
        assert_eq!(small.drawable_area, big.drawable_area * k);
        assert_eq!(small.border_width, big.border_width * k);
        assert_eq!(small.center.0, big.center.0 * k);
        assert_eq!(small.center.1, big.center.1 * k);
        assert_eq!(small.drawn_size.0, big.drawn_size.0 * k);
    }

    #[test]
    fn scale_is_multiplicative_with_area_fit() {
        let model = TransformModel::default()
            .apply(&Edit::Padding(Padding::px(64.0)))
            .apply(&Edit::Scale(2.0));
        let layout = plan_layout(&model, Some((100, 50)), 512, 512);
        // area = 512 - 128 = 384, fit = 0.75, drawn = 100 * 2 * 0.75
        assert_eq!(layout.drawn_size, (150.0, 75.0));
    }

    #[test]
    fn degenerate_layout_hides_image() {
        let model = TransformModel::default()
            .apply(&Edit::Padding(Padding::px(256.0)))
            .apply(&Edit::BorderWidth(256.0));
        let layout = plan_layout(&model, Some((100, 100)), 48, 512);
        assert!(!layout.image_visible());
        assert_eq!(layout.drawn_size, (0.0, 0.0));
    }

    #[test]
    fn missing_source_has_no_drawn_size() {
        let layout = plan_layout(&TransformModel::default(), None, 512, 512);
        assert!(!layout.image_visible());
    }

    #[test]
    fn text_anchor_offsets_scale_with_target() {
        let text = TextOverlay {
            content: "Hi".into(),
            x_offset: 100.0,
            y_offset: -50.0,
            ..TextOverlay::default()
        };
        assert_eq!(text_anchor(&text, 512, 1.0), (356.0, 206.0));
        assert_eq!(text_anchor(&text, 48, 48.0 / 512.0), (24.0 + 9.375, 24.0 - 4.6875));
    }

    #[test]
    fn prefilter_only_for_downscale() {
        assert_eq!(prefilter_dimensions((200, 200), (18.75, 18.75)), Some((19, 19)));
        assert_eq!(prefilter_dimensions((200, 200), (400.0, 400.0)), None);
        assert_eq!(prefilter_dimensions((200, 100), (200.0, 100.0)), None);
        assert_eq!(prefilter_dimensions((4, 4), (0.2, 0.2)), Some((1, 1)));
    }

    #[test]
    fn corner_radius_is_proportional() {
        assert_eq!(corner_radius(512), 76.8);
        assert!((corner_radius(48) - 7.2).abs() < 1e-9);
    }
}
