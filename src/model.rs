//! The Transform Model: every editable parameter of an icon as one value.
//!
//! A [`TransformModel`] is copied on every mutation. [`TransformModel::apply`]
//! takes `&self` and returns the edited copy, so snapshots handed to the
//! history or to an export batch can never be changed underneath them.
//!
//! All geometric fields (offsets, padding, border width, text offsets and font
//! size) are expressed in pixels of the **reference canvas** (the live preview
//! surface). The compositor rescales them for each target size.
//!
//! The model itself never rejects a value. Range checks live at the boundary
//! ([`TransformModel::validate`], called by [`load_edits`] and the CLI).

use crate::types::{FilterKind, IconShape, Padding, Rgb, TextOverlay};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("edits parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// The full set of editable icon parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformModel {
    /// User zoom, multiplied with the drawable-area fit factor.
    pub scale: f64,
    /// Degrees clockwise. Any real value; see [`TransformModel::display_rotation`].
    pub rotation: f64,
    pub x_offset: f64,
    pub y_offset: f64,
    pub background_color: Rgb,
    pub padding: Padding,
    pub border_width: f64,
    pub border_color: Rgb,
    pub icon_shape: IconShape,
    pub filter: FilterKind,
    pub text: TextOverlay,
}

impl Default for TransformModel {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            x_offset: 0.0,
            y_offset: 0.0,
            background_color: Rgb::WHITE,
            padding: Padding::default(),
            border_width: 0.0,
            border_color: Rgb::BLACK,
            icon_shape: IconShape::None,
            filter: FilterKind::None,
            text: TextOverlay::default(),
        }
    }
}

/// Scale at which a `width × height` source fits inside the reference canvas.
///
/// Returns `1.0` unless the source exceeds the reference size on either axis.
pub fn fit_scale(width: u32, height: u32, reference_size: u32) -> f64 {
    if width == 0 || height == 0 {
        return 1.0;
    }
    if width > reference_size || height > reference_size {
        let r = reference_size as f64;
        (r / width as f64).min(r / height as f64)
    } else {
        1.0
    }
}

impl TransformModel {
    /// Defaults for a freshly loaded source of the given dimensions.
    ///
    /// This becomes the reset target for the rest of that image's session.
    pub fn defaults_for(source_dims: Option<(u32, u32)>, reference_size: u32) -> Self {
        let scale = source_dims
            .map(|(w, h)| fit_scale(w, h, reference_size))
            .unwrap_or(1.0);
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Rotation normalized to `[0, 360)` for display.
    pub fn display_rotation(&self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }

    /// Return a copy with `edit` applied.
    pub fn apply(&self, edit: &Edit) -> Self {
        let mut next = self.clone();
        match edit {
            Edit::Scale(v) => next.scale = *v,
            Edit::Rotation(v) => next.rotation = *v,
            Edit::Offset { x, y } => {
                next.x_offset = *x;
                next.y_offset = *y;
            }
            Edit::XOffset(v) => next.x_offset = *v,
            Edit::YOffset(v) => next.y_offset = *v,
            Edit::BackgroundColor(c) => next.background_color = *c,
            Edit::Padding(p) => next.padding = *p,
            Edit::BorderWidth(v) => next.border_width = *v,
            Edit::BorderColor(c) => next.border_color = *c,
            Edit::IconShape(s) => next.icon_shape = *s,
            Edit::Filter(f) => next.filter = *f,
            Edit::Text(t) => next.text = t.clone(),
            Edit::Replace(model) => next = (**model).clone(),
        }
        next
    }

    /// Return a copy with one property restored from `defaults`.
    pub fn reset_property(&self, property: Property, defaults: &TransformModel) -> Self {
        let mut next = self.clone();
        match property {
            Property::Scale => next.scale = defaults.scale,
            Property::Rotation => next.rotation = defaults.rotation,
            Property::XOffset => next.x_offset = defaults.x_offset,
            Property::YOffset => next.y_offset = defaults.y_offset,
            Property::BackgroundColor => next.background_color = defaults.background_color,
            Property::Padding => next.padding = defaults.padding,
            Property::BorderWidth => next.border_width = defaults.border_width,
            Property::BorderColor => next.border_color = defaults.border_color,
            Property::IconShape => next.icon_shape = defaults.icon_shape,
            Property::Filter => next.filter = defaults.filter,
            Property::Text => next.text = defaults.text.clone(),
        }
        next
    }

    /// Boundary check for values arriving from the CLI or an edits file.
    pub fn validate(&self) -> Result<(), ModelError> {
        fn check(field: &'static str, ok: bool, reason: &str) -> Result<(), ModelError> {
            if ok {
                Ok(())
            } else {
                Err(ModelError::OutOfRange {
                    field,
                    reason: reason.to_string(),
                })
            }
        }

        check(
            "scale",
            self.scale.is_finite() && self.scale > 0.0,
            "must be a finite number > 0",
        )?;
        check("rotation", self.rotation.is_finite(), "must be finite")?;
        check(
            "x_offset/y_offset",
            self.x_offset.is_finite() && self.y_offset.is_finite(),
            "must be finite",
        )?;
        check(
            "padding",
            self.padding.value.is_finite() && self.padding.value >= 0.0,
            "must be >= 0",
        )?;
        check(
            "border_width",
            self.border_width.is_finite() && self.border_width >= 0.0,
            "must be >= 0",
        )?;
        check(
            "text.font_size",
            self.text.font_size.is_finite() && self.text.font_size > 0.0,
            "must be > 0",
        )?;
        check(
            "text.x_offset/text.y_offset",
            self.text.x_offset.is_finite() && self.text.y_offset.is_finite(),
            "must be finite",
        )
    }
}

/// A single user mutation of the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Scale(f64),
    Rotation(f64),
    Offset { x: f64, y: f64 },
    XOffset(f64),
    YOffset(f64),
    BackgroundColor(Rgb),
    Padding(Padding),
    BorderWidth(f64),
    BorderColor(Rgb),
    IconShape(IconShape),
    Filter(FilterKind),
    Text(TextOverlay),
    /// Replace every field at once (edits file, scripted sessions).
    Replace(Box<TransformModel>),
}

/// Individually resettable model properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Scale,
    Rotation,
    XOffset,
    YOffset,
    BackgroundColor,
    Padding,
    BorderWidth,
    BorderColor,
    IconShape,
    Filter,
    Text,
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "scale" => Property::Scale,
            "rotation" => Property::Rotation,
            "x_offset" | "xOffset" => Property::XOffset,
            "y_offset" | "yOffset" => Property::YOffset,
            "background_color" | "backgroundColor" => Property::BackgroundColor,
            "padding" => Property::Padding,
            "border_width" | "borderWidth" => Property::BorderWidth,
            "border_color" | "borderColor" => Property::BorderColor,
            "icon_shape" | "iconShape" => Property::IconShape,
            "filter" => Property::Filter,
            "text" => Property::Text,
            other => return Err(format!("unknown property: {other}")),
        })
    }
}

/// Edits loaded from a TOML file, before defaults for a concrete source apply.
///
/// `scale_given` is false when the file omits `scale`, so the caller can
/// substitute the fit-scale of the image being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct EditsFile {
    pub model: TransformModel,
    pub scale_given: bool,
}

impl EditsFile {
    /// Resolve against the session defaults for the loaded source.
    ///
    /// An explicit scale is absolute and replaces the fit-scale.
    pub fn resolve(&self, defaults: &TransformModel) -> TransformModel {
        if self.scale_given {
            self.model.clone()
        } else {
            TransformModel {
                scale: defaults.scale,
                ..self.model.clone()
            }
        }
    }
}

/// Parse edits from TOML text and validate them.
pub fn parse_edits(content: &str) -> Result<EditsFile, ModelError> {
    let raw: toml::Value = toml::from_str(content)?;
    let scale_given = raw.get("scale").is_some();
    let model: TransformModel = raw.try_into()?;
    model.validate()?;
    Ok(EditsFile { model, scale_given })
}

/// Load and validate an edits file.
pub fn load_edits(path: &Path) -> Result<EditsFile, ModelError> {
    let content = std::fs::read_to_string(path)?;
    parse_edits(&content)
}
