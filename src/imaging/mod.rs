//! Icon compositing in pure Rust. The only system dependency is the font
//! database consulted for a default caption font.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` (PNG, JPEG, WebP, TIFF) |
//! | **Pre-resample** | `image::imageops::resize` with `Lanczos3` |
//! | **Place image** | `imageproc::geometric_transformations::warp_into` (bilinear) |
//! | **Shape clip, border** | signed distance coverage ([`shape`]) |
//! | **Filters** | per-pixel operators, blur via [`BlurPrimitive`] |
//! | **Text** | `ab_glyph` outlines, system fonts via `font-kit` |
//! | **Encode** | `image::codecs::png::PngEncoder` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for layout math (unit testable)
//! - **Shape / Filters / Text**: Pixel stages, each pure over a surface
//! - **Compositor**: [`Compositor`] running the stages in order
//! - **Codec**: PNG encoding for export

mod calculations;
pub mod codec;
pub mod compositor;
pub mod filters;
pub mod shape;
pub mod text;

pub use calculations::{Layout, ROUNDED_CORNER_RATIO, drawable_area, plan_layout, scale_factor};
pub use codec::{EncodeError, encode_png};
pub use compositor::{Compositor, DEFAULT_REFERENCE_SIZE, MAX_CANVAS_SIZE, RenderError};
pub use filters::{BlurPrimitive, ImageOpsBlur, NoBlur, sharpen};
pub use text::{TextError, load_font, load_system_font};
