//! Shared value types used by the model, the compositor and the edits file.
//!
//! Everything here is `Copy` or cheap to clone and serializes to a
//! human-editable TOML form (`"#rrggbb"` colors, lowercase enum names).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color '{0}': expected #rrggbb or #rgb")]
pub struct ColorParseError(pub String);

/// An opaque RGB color, serialized as `"#rrggbb"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255, 255, 255]);
    pub const BLACK: Rgb = Rgb([0, 0, 0]);

    pub fn to_rgba(self) -> image::Rgba<u8> {
        let [r, g, b] = self.0;
        image::Rgba([r, g, b, 255])
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(s.to_string()))?;
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_string(),
            _ => return Err(ColorParseError(s.to_string())),
        };
        let channel = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| ColorParseError(s.to_string()))
        };
        Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

/// Unit for [`Padding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingUnit {
    #[default]
    Px,
    /// Percent of the reference canvas dimension.
    Percent,
}

/// Inset between the canvas edge (inside the border) and the image area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Padding {
    pub value: f64,
    pub unit: PaddingUnit,
}

impl Padding {
    pub fn px(value: f64) -> Self {
        Self {
            value,
            unit: PaddingUnit::Px,
        }
    }

    pub fn percent(value: f64) -> Self {
        Self {
            value,
            unit: PaddingUnit::Percent,
        }
    }

    /// Padding in reference-canvas pixels.
    pub fn resolve(self, reference_size: u32) -> f64 {
        match self.unit {
            PaddingUnit::Px => self.value,
            PaddingUnit::Percent => self.value / 100.0 * reference_size as f64,
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            PaddingUnit::Px => write!(f, "{}px", self.value),
            PaddingUnit::Percent => write!(f, "{}%", self.value),
        }
    }
}

/// Clip shape applied to the whole icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconShape {
    #[default]
    None,
    Circle,
    RoundedSquare,
}

impl FromStr for IconShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(IconShape::None),
            "circle" => Ok(IconShape::Circle),
            "rounded-square" => Ok(IconShape::RoundedSquare),
            other => Err(format!("unknown icon shape: {other}")),
        }
    }
}

impl fmt::Display for IconShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IconShape::None => "none",
            IconShape::Circle => "circle",
            IconShape::RoundedSquare => "rounded-square",
        })
    }
}

/// Whole-surface color filter selected in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    None,
    Grayscale,
    Sepia,
    Invert,
    Blur,
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(FilterKind::None),
            "grayscale" => Ok(FilterKind::Grayscale),
            "sepia" => Ok(FilterKind::Sepia),
            "invert" => Ok(FilterKind::Invert),
            "blur" => Ok(FilterKind::Blur),
            other => Err(format!("unknown filter: {other}")),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilterKind::None => "none",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Invert => "invert",
            FilterKind::Blur => "blur",
        })
    }
}

/// Optional caption drawn above every other layer.
///
/// Offsets are reference-canvas pixels relative to the canvas center and are
/// independent of the image offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextOverlay {
    pub content: String,
    pub font_size: f64,
    pub font_color: Rgb,
    pub x_offset: f64,
    pub y_offset: f64,
}

impl TextOverlay {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_size: 48.0,
            font_color: Rgb::BLACK,
            x_offset: 0.0,
            y_offset: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_and_short_hex() {
        assert_eq!("#ff8000".parse::<Rgb>().unwrap(), Rgb([255, 128, 0]));
        assert_eq!("#f80".parse::<Rgb>().unwrap(), Rgb([255, 136, 0]));
    }

    #[test]
    fn reject_malformed_colors() {
        assert!("ff8000".parse::<Rgb>().is_err());
        assert!("#ff80".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn color_displays_lowercase_hex() {
        assert_eq!(Rgb([0xAB, 0x01, 0xFF]).to_string(), "#ab01ff");
    }

    #[test]
    fn percent_padding_resolves_against_reference() {
        assert_eq!(Padding::percent(10.0).resolve(512), 51.2);
        assert_eq!(Padding::px(12.0).resolve(512), 12.0);
    }

    #[test]
    fn display_names_parse_back() {
        for shape in [IconShape::None, IconShape::Circle, IconShape::RoundedSquare] {
            assert_eq!(shape.to_string().parse::<IconShape>().unwrap(), shape);
        }
        assert_eq!(FilterKind::Sepia.to_string(), "sepia");
        assert_eq!(Padding::percent(5.0).to_string(), "5%");
    }

    #[test]
    fn enums_use_kebab_names_in_toml() {
        #[derive(Deserialize)]
        struct Fields {
            shape: IconShape,
            filter: FilterKind,
        }
        let fields: Fields = toml::from_str("shape = \"rounded-square\"\nfilter = \"sepia\"").unwrap();
        assert_eq!(fields.shape, IconShape::RoundedSquare);
        assert_eq!(fields.filter, FilterKind::Sepia);
    }
}
