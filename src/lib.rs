//! # Iconsmith
//!
//! An app-icon editor and exporter. Load one source image, adjust it
//! (scale, rotate, offset, pad, border, clip to a shape, filter, caption),
//! and export every launcher icon size a platform needs in one pass.
//!
//! # Architecture: One Model, Many Renders
//!
//! Every pixel the tool produces comes from the same function:
//!
//! ```text
//! TransformModel + SourceImage + target size  →  Compositor::render  →  RGBA
//! ```
//!
//! The interactive preview is that function at the reference size (512 px).
//! Each exported icon is that function at its own pixel size. All offsets,
//! widths and font sizes in the model are expressed in reference-canvas
//! pixels and multiplied by `target / reference` at render time, so a 48 px
//! icon is a faithful miniature of the preview rather than a downscale of it.
//!
//! ```text
//! EditorSession ── apply / drag / release / undo / redo ──▶ preview
//!       │
//!       └── export ──▶ SizeTable ──(rayon)──▶ render + encode ──▶ ArchiveSink
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Value types shared by the model and renderer: colors, padding, shapes, filters, text |
//! | [`model`] | [`model::TransformModel`], edits, per-image defaults, edits files |
//! | [`source`] | File and HTTP(S) image providers, decoding, readability of remote sources |
//! | [`imaging`] | The compositor and its stages: layout math, shape clip, filters, text, PNG encoding |
//! | [`history`] | Bounded linear undo/redo of committed states |
//! | [`input`] | Drag-sample throttling with a trailing flush |
//! | [`session`] | The editing session tying model, history, preview and status messages together |
//! | [`sizes`] | Platform size tables and archive path conventions |
//! | [`archive`] | ZIP and directory sinks for exported icons |
//! | [`export`] | Parallel multi-size export with per-icon failure isolation |
//! | [`handoff`] | Read-once slot for passing an image location between tools |
//! | [`config`] | `config.toml` loading, stock defaults, merging and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fit Scale As Default
//!
//! A loaded image gets a default scale that fits it inside the reference
//! canvas. That fit factor is only the starting point: a user scale replaces
//! it outright, so `scale = 1.2` draws a 1024 px source at 1.2×, not 0.6×.
//! "Reset scale" returns to the fitted value.
//!
//! ## Layer Order
//!
//! Background, image, border, filter, text, then shape clip. The border sits
//! over the image and the filter stops below the text. The clip comes last,
//! so every layer shares one silhouette and the outside stays transparent.
//!
//! ## Partial Exports Over All-Or-Nothing
//!
//! One icon failing to render, encode or archive is recorded and reported;
//! the rest of the export proceeds. Only a missing or unreadable source
//! aborts the whole export, because then no icon could succeed.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and PNG encoding use the `image` crate, projective
//! warps come from `imageproc` and glyph outlines from `ab_glyph`. The system
//! is consulted only for a default caption font, through `font-kit`.

pub mod archive;
pub mod config;
pub mod export;
pub mod handoff;
pub mod history;
pub mod imaging;
pub mod input;
pub mod model;
pub mod output;
pub mod session;
pub mod sizes;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
