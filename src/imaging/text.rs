//! Text overlay rasterization with `ab_glyph`.
//!
//! The caption is laid out on a single baseline with kerning, centered on
//! its anchor both horizontally and vertically (the em box, not the ink
//! bounds, so a caption does not jump as letters with descenders are typed).
//! Glyph coverage is blended onto the surface with the same straight-alpha
//! source-over used for the border.
//!
//! Fonts come either from a file ([`load_font`]) or from the system font
//! database through `font-kit` ([`load_system_font`]).

use super::shape::blend_over;
use crate::types::Rgb;
use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::RgbaImage;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid font {0}")]
    InvalidFont(String),
}

/// Load a TrueType/OpenType font from disk.
pub fn load_font(path: &Path) -> Result<FontArc, TextError> {
    let bytes = std::fs::read(path)?;
    FontArc::try_from_vec(bytes).map_err(|e| TextError::InvalidFont(format!("{}: {e}", path.display())))
}

/// Find a system font through `font-kit`.
///
/// `family` is tried first, then the generic sans-serif family. Returns
/// `None` when the system has no usable font at all.
pub fn load_system_font(family: Option<&str>) -> Option<FontArc> {
    use font_kit::family_name::FamilyName;
    use font_kit::properties::Properties;
    use font_kit::source::SystemSource;

    let mut families = Vec::new();
    if let Some(name) = family {
        families.push(FamilyName::Title(name.to_string()));
    }
    families.push(FamilyName::SansSerif);

    let handle = SystemSource::new()
        .select_best_match(&families, &Properties::new())
        .ok()?;
    let font = handle.load().ok()?;
    let data = font.copy_font_data()?;
    debug!(font = %font.full_name(), "using system font");
    FontArc::try_from_vec((*data).clone()).ok()
}

/// Horizontal advance of `text` at `font_size` pixels, including kerning.
pub fn measure(font: &FontArc, text: &str, font_size: f32) -> f32 {
    let scaled = font.as_scaled(font_size);
    let mut width = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            width += scaled.kern(p, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

/// Draw `text` centered on `anchor`.
///
/// Returns the number of pixels touched (zero when nothing is visible).
pub fn draw_centered(
    surface: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    font_size: f32,
    color: Rgb,
    anchor: (f64, f64),
) -> usize {
    if text.is_empty() || font_size <= 0.0 {
        return 0;
    }
    let scaled = font.as_scaled(font_size);
    let width = measure(font, text, font_size);
    let origin_x = anchor.0 as f32 - width / 2.0;
    // descent is negative in ab_glyph
    let baseline = anchor.1 as f32 + (scaled.ascent() + scaled.descent()) / 2.0;

    let (w, h) = surface.dimensions();
    let mut touched = 0;
    let mut caret = origin_x;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(p) = prev {
            caret += scaled.kern(p, id);
        }
        let glyph = id.with_scale_and_position(font_size, point(caret, baseline));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, cov| {
            let x = bounds.min.x as i64 + gx as i64;
            let y = bounds.min.y as i64 + gy as i64;
            if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 || cov <= 0.0 {
                return;
            }
            blend_over(surface.get_pixel_mut(x as u32, y as u32), color, cov.min(1.0) as f64);
            touched += 1;
        });
    }
    touched
}
