//! PNG encoding of rendered surfaces.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("PNG encode failed: {0}")]
pub struct EncodeError(#[from] image::ImageError);

/// Encode an RGBA surface as a PNG byte stream.
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        surface.as_raw(),
        surface.width(),
        surface.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(bytes)
}
