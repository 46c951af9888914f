//! The compositor: one function from `(source, model, size)` to pixels.
//!
//! Preview and export both go through [`Compositor::render`]; the only input
//! that differs between them is `target_size`. Every stage works in target
//! pixels derived from reference-canvas values through
//! [`plan_layout`](super::calculations::plan_layout), so a 48px icon is the
//! 512px preview redrawn at a smaller scale, not a downsample of it.
//!
//! ## Stages
//!
//! ```text
//! background fill → image (or placeholder) → border → filter → text → shape clip
//! ```
//!
//! The shape clip is applied last as an alpha mask, which confines every
//! earlier stage to the shape and leaves the area outside it transparent.
//!
//! The image stage pre-resamples the source with Lanczos3 when it shrinks
//! (the warp alone would alias), then places it with a single affine
//! projection (translate, rotate, scale) sampled bilinearly.

use super::calculations::{Layout, plan_layout, prefilter_dimensions, text_anchor};
use super::filters::{BlurPrimitive, ImageOpsBlur, apply_filter};
use super::shape::{apply_clip, blend_over, coverage, stroke_border};
use super::text::draw_centered;
use crate::model::TransformModel;
use crate::source::SourceImage;
use crate::types::Rgb;
use ab_glyph::FontArc;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest surface the compositor will allocate.
pub const MAX_CANVAS_SIZE: u32 = 8192;

/// Default reference canvas side length.
pub const DEFAULT_REFERENCE_SIZE: u32 = 512;

/// Default blur sigma in reference pixels.
pub const DEFAULT_BLUR_SIGMA: f32 = 2.0;

const PLACEHOLDER_COLOR: Rgb = Rgb([0xcc, 0xcc, 0xcc]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("target size must be at least 1px")]
    EmptyCanvas,
    #[error("target size {size}px exceeds the {max}px limit")]
    CanvasTooLarge { size: u32, max: u32 },
}

/// Renders a [`TransformModel`] onto square surfaces of any size.
///
/// Cheap to clone and `Sync`, so export batches share one across threads.
#[derive(Clone)]
pub struct Compositor {
    reference_size: u32,
    blur_sigma: f32,
    blur: Arc<dyn BlurPrimitive>,
    font: Option<FontArc>,
}

impl fmt::Debug for Compositor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositor")
            .field("reference_size", &self.reference_size)
            .field("blur_sigma", &self.blur_sigma)
            .field("blur", &self.blur.name())
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_SIZE)
    }
}

impl Compositor {
    pub fn new(reference_size: u32) -> Self {
        Self {
            reference_size,
            blur_sigma: DEFAULT_BLUR_SIGMA,
            blur: Arc::new(ImageOpsBlur),
            font: None,
        }
    }

    pub fn with_blur(mut self, blur: Arc<dyn BlurPrimitive>) -> Self {
        self.blur = blur;
        self
    }

    pub fn with_blur_sigma(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn reference_size(&self) -> u32 {
        self.reference_size
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Composite `model` onto a fresh `target_size × target_size` surface.
    ///
    /// With no source the image stage draws a placeholder marker. Degenerate
    /// geometry (no drawable area) is not an error: the image is skipped and
    /// the remaining stages still run.
    pub fn render(
        &self,
        model: &TransformModel,
        source: Option<&SourceImage>,
        target_size: u32,
    ) -> Result<RgbaImage, RenderError> {
        if target_size == 0 {
            return Err(RenderError::EmptyCanvas);
        }
        if target_size > MAX_CANVAS_SIZE {
            return Err(RenderError::CanvasTooLarge {
                size: target_size,
                max: MAX_CANVAS_SIZE,
            });
        }

        let layout = plan_layout(
            model,
            source.map(SourceImage::dimensions),
            target_size,
            self.reference_size,
        );
        debug!(
            target_size,
            scale_factor = layout.scale_factor,
            drawable_area = layout.drawable_area,
            "compositing"
        );

        let mut canvas = RgbaImage::from_pixel(target_size, target_size, model.background_color.to_rgba());

        match source {
            Some(src) if layout.image_visible() => draw_image(&mut canvas, src.pixels(), &layout),
            Some(_) => {
                warn!(
                    target_size,
                    drawable_area = layout.drawable_area,
                    "no drawable area left for the image, skipping it"
                );
            }
            None => draw_placeholder(&mut canvas),
        }

        stroke_border(&mut canvas, model.icon_shape, layout.border_width, model.border_color);

        let sigma = self.blur_sigma * layout.scale_factor as f32;
        apply_filter(&mut canvas, model.filter, self.blur.as_ref(), sigma);

        if !model.text.is_empty() {
            self.draw_text(&mut canvas, model, &layout);
        }

        apply_clip(&mut canvas, model.icon_shape);
        Ok(canvas)
    }

    fn draw_text(&self, canvas: &mut RgbaImage, model: &TransformModel, layout: &Layout) {
        let Some(font) = &self.font else {
            warn!("text overlay set but no font is available, skipping it");
            return;
        };
        let text = &model.text;
        let anchor = text_anchor(text, layout.target_size, layout.scale_factor);
        let size = (text.font_size * layout.scale_factor) as f32;
        draw_centered(canvas, font, &text.content, size, text.font_color, anchor);
    }
}

/// Draw the source through the layout's affine placement.
fn draw_image(canvas: &mut RgbaImage, pixels: &RgbaImage, layout: &Layout) {
    let resized;
    let src = match prefilter_dimensions(pixels.dimensions(), layout.drawn_size) {
        Some((w, h)) => {
            resized = image::imageops::resize(pixels, w, h, FilterType::Lanczos3);
            &resized
        }
        None => pixels,
    };

    let (w, h) = src.dimensions();
    let sx = (layout.drawn_size.0 / w as f64) as f32;
    let sy = (layout.drawn_size.1 / h as f64) as f32;
    let (cx, cy) = (layout.center.0 as f32, layout.center.1 as f32);

    // Pixel indices sit half a pixel off the continuous coordinates.
    let projection = Projection::translate(cx - 0.5, cy - 0.5)
        * Projection::rotate(layout.rotation as f32)
        * Projection::scale(sx, sy)
        * Projection::translate(0.5 - w as f32 / 2.0, 0.5 - h as f32 / 2.0);

    let size = layout.target_size;
    let mut layer = RgbaImage::new(size, size);
    warp_into(
        src,
        &projection,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
        &mut layer,
    );
    image::imageops::overlay(canvas, &layer, 0, 0);
}

/// Centered "no image" cross, drawn in place of a missing source.
fn draw_placeholder(canvas: &mut RgbaImage) {
    let size = canvas.width() as f64;
    let c = size / 2.0;
    let arm = size * 0.2;
    let half_thickness = (size * 0.02).max(0.5);
    for (x, y, px) in canvas.enumerate_pixels_mut() {
        let (dx, dy) = (x as f64 + 0.5 - c, y as f64 + 0.5 - c);
        let d = segment_distance(dx, dy, arm).min(segment_distance(dx, -dy, arm));
        blend_over(px, PLACEHOLDER_COLOR, coverage(half_thickness - d));
    }
}

/// Distance from `(x, y)` to the diagonal segment from `(-arm, -arm)` to `(arm, arm)`.
fn segment_distance(x: f64, y: f64, arm: f64) -> f64 {
    let t = ((x + y) / 2.0).clamp(-arm, arm);
    (x - t).hypot(y - t)
}
