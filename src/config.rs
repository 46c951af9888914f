//! Editor configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are the base layer; a user file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `iconsmith` looks for `config.toml` in the working directory, or takes an
//! explicit path with `--config FILE`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [canvas]
//! reference_size = 512      # Side of the live preview canvas in pixels
//!
//! [history]
//! max_entries = 50          # Undo steps kept
//!
//! [input]
//! throttle_ms = 75          # Minimum gap between drag re-renders
//! status_ttl_ms = 4000      # Status message lifetime
//!
//! [filters]
//! blur_sigma = 2.0          # Blur radius in reference pixels
//!
//! [text]
//! # font_path = "fonts/Inter.ttf"   # Font file; wins over font_family
//! # font_family = "Inter"           # System family, falls back to sans-serif
//!
//! [source]
//! # origin = "https://app.example"  # Page origin for CORS readability
//! timeout_secs = 30         # Remote fetch timeout
//! max_bytes = 33554432      # Largest remote image accepted
//!
//! [export]
//! platforms = ["android"]   # "android" and/or "ios"
//! store_listing = false     # Add the 512px Play Store icon
//! sharpen = false           # Sharpen every exported icon
//! archive = true            # Also write a ZIP archive
//! archive_name = "android_icons.zip"
//!
//! [[export.extra_sizes]]
//! platform = "web"
//! name = "favicon"
//! size = 32
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Compositor, TextError, load_font, load_system_font};
use crate::sizes::{ANDROID, IOS, SizeTable, SizeTableEntry};
use crate::source::{DEFAULT_MAX_REMOTE_BYTES, HttpSource, LocationSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("font: {0}")]
    Font(#[from] TextError),
}

/// Editor configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub history: HistoryConfig,
    pub input: InputConfig,
    pub filters: FiltersConfig,
    pub text: TextConfig,
    pub source: SourceConfig,
    pub export: ExportConfig,
    pub processing: ProcessingConfig,
}

impl EditorConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.reference_size == 0 {
            return Err(ConfigError::Validation(
                "canvas.reference_size must be > 0".into(),
            ));
        }
        if self.history.max_entries == 0 {
            return Err(ConfigError::Validation(
                "history.max_entries must be > 0".into(),
            ));
        }
        if !(self.filters.blur_sigma.is_finite() && self.filters.blur_sigma >= 0.0) {
            return Err(ConfigError::Validation(
                "filters.blur_sigma must be >= 0".into(),
            ));
        }
        if self.source.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "source.max_bytes must be > 0".into(),
            ));
        }
        if self.export.archive_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "export.archive_name must not be empty".into(),
            ));
        }
        if let Some(p) = self
            .export
            .platforms
            .iter()
            .find(|p| p.as_str() != ANDROID && p.as_str() != IOS)
        {
            return Err(ConfigError::Validation(format!(
                "export.platforms: unknown platform '{p}' (expected \"android\" or \"ios\")"
            )));
        }
        if let Some(e) = self.export.extra_sizes.iter().find(|e| e.pixel_size == 0) {
            return Err(ConfigError::Validation(format!(
                "export.extra_sizes: {} must have size > 0",
                e.label()
            )));
        }
        Ok(())
    }

    /// A compositor set up from the canvas, filter and text sections.
    ///
    /// Without a `font_path` the system font database supplies the caption
    /// font; only when it has none are text overlays skipped.
    pub fn compositor(&self) -> Result<Compositor, ConfigError> {
        let font = match &self.text.font_path {
            Some(path) => Some(load_font(path)?),
            None => {
                let font = load_system_font(self.text.font_family.as_deref());
                if font.is_none() {
                    warn!("no system font found, text overlays will be skipped");
                }
                font
            }
        };
        Ok(Compositor::new(self.canvas.reference_size)
            .with_blur_sigma(self.filters.blur_sigma)
            .with_font(font))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Side of the reference (preview) canvas; all model geometry is in its pixels.
    pub reference_size: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            reference_size: 512,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 50 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    pub throttle_ms: u64,
    pub status_ttl_ms: u64,
}

impl InputConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn status_ttl(&self) -> Duration {
        Duration::from_millis(self.status_ttl_ms)
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            throttle_ms: 75,
            status_ttl_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersConfig {
    /// Gaussian sigma for the blur filter, in reference pixels.
    pub blur_sigma: f32,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self { blur_sigma: 2.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextConfig {
    /// TrueType/OpenType font file for the text overlay.
    pub font_path: Option<PathBuf>,
    /// System font family used when no file is given.
    pub font_family: Option<String>,
}

/// Where source images may be fetched from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Page origin remote images are checked against; unset means every
    /// fetched image is readable.
    pub origin: Option<String>,
    pub timeout_secs: u64,
    pub max_bytes: u64,
}

impl SourceConfig {
    /// A provider for local paths and http(s) URLs.
    pub fn provider(&self) -> LocationSource {
        LocationSource {
            http: HttpSource::new(
                self.origin.clone(),
                Duration::from_secs(self.timeout_secs),
                self.max_bytes,
            ),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            origin: None,
            timeout_secs: 30,
            max_bytes: DEFAULT_MAX_REMOTE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub platforms: Vec<String>,
    pub store_listing: bool,
    pub sharpen: bool,
    pub archive: bool,
    pub archive_name: String,
    pub extra_sizes: Vec<SizeTableEntry>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            platforms: vec![ANDROID.to_string()],
            store_listing: false,
            sharpen: false,
            archive: true,
            archive_name: "android_icons.zip".to_string(),
            extra_sizes: Vec::new(),
        }
    }
}

impl ExportConfig {
    /// The size table this section describes.
    pub fn size_table(&self) -> SizeTable {
        let mut table = SizeTable::new();
        if self.platforms.iter().any(|p| p == ANDROID) {
            table.extend_android();
        }
        if self.store_listing {
            table.extend_store_listing();
        }
        if self.platforms.iter().any(|p| p == IOS) {
            table.extend_ios();
        }
        for entry in &self.extra_sizes {
            table.push(entry.clone());
        }
        table
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel export workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(EditorConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EditorConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EditorConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from the given directory, falling back to defaults.
pub fn load_config(dir: &Path) -> Result<EditorConfig, ConfigError> {
    load_config_file(&dir.join("config.toml"))
}

/// Load a specific config file, falling back to defaults if it is absent.
pub fn load_config_file(path: &Path) -> Result<EditorConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# iconsmith Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Canvas
# ---------------------------------------------------------------------------
[canvas]
# Side of the live preview canvas in pixels. Offsets, padding, border width
# and font size in edits files are measured on this canvas and rescaled for
# every export size.
reference_size = 512

# ---------------------------------------------------------------------------
# History
# ---------------------------------------------------------------------------
[history]
# Number of undo steps kept. The oldest step is dropped beyond this.
max_entries = 50

# ---------------------------------------------------------------------------
# Input
# ---------------------------------------------------------------------------
[input]
# Minimum time between re-renders while a value is being dragged.
throttle_ms = 75

# How long info/success/error status messages stay visible.
status_ttl_ms = 4000

# ---------------------------------------------------------------------------
# Filters
# ---------------------------------------------------------------------------
[filters]
# Gaussian blur sigma in reference pixels (scaled per export size).
blur_sigma = 2.0

# ---------------------------------------------------------------------------
# Text overlay
# ---------------------------------------------------------------------------
[text]
# TrueType/OpenType font file used for the text overlay.
# font_path = "fonts/Inter-Bold.ttf"

# Without a font file, this system family is used, falling back to the
# system sans-serif. The overlay is only skipped if no font exists at all.
# font_family = "Inter"

# ---------------------------------------------------------------------------
# Source images
# ---------------------------------------------------------------------------
[source]
# Page origin for remote images. When set, an image from another origin is
# only exportable if its Access-Control-Allow-Origin header admits this one.
# origin = "https://app.example"

# Timeout for one remote fetch, in seconds.
timeout_secs = 30

# Largest remote image accepted, in bytes.
max_bytes = 33554432

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Icon sets to produce: "android" (mdpi..xxxhdpi) and/or "ios" (AppIcon slots).
platforms = ["android"]

# Add the 512px Play Store listing icon.
store_listing = false

# Sharpen every icon after compositing (3x3 kernel).
sharpen = false

# Write a ZIP archive next to the individual files.
archive = true
archive_name = "android_icons.zip"

# Extra sizes, appended to the table above.
# [[export.extra_sizes]]
# platform = "web"
# name = "favicon"
# size = 32

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel export workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = EditorConfig::default();
        assert_eq!(config.canvas.reference_size, 512);
        assert_eq!(config.history.max_entries, 50);
        assert_eq!(config.input.throttle(), Duration::from_millis(75));
        assert_eq!(config.filters.blur_sigma, 2.0);
        assert_eq!(config.text.font_path, None);
        assert_eq!(config.export.platforms, vec!["android"]);
        assert!(config.export.archive);
        assert_eq!(config.export.archive_name, "android_icons.zip");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[export]
sharpen = true
"#;
        let config: EditorConfig = toml::from_str(toml).unwrap();
        assert!(config.export.sharpen);
        // Defaults preserved
        assert!(config.export.archive);
        assert_eq!(config.canvas.reference_size, 512);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[history]
max_entries = 10

[export]
platforms = ["android", "ios"]
store_listing = true

[[export.extra_sizes]]
platform = "web"
name = "favicon"
size = 32
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.history.max_entries, 10);
        assert_eq!(config.export.extra_sizes.len(), 1);
        // Unspecified values should be defaults
        assert_eq!(config.input.throttle_ms, 75);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not = [valid").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            "[canvas]\nreference_sise = 256\n",
        )
        .unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<EditorConfig, _> = toml::from_str("[preview]\nsize = 3\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_reference_size() {
        let mut config = EditorConfig::default();
        config.canvas.reference_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_unknown_platform() {
        let mut config = EditorConfig::default();
        config.export.platforms.push("windows".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("windows"));
    }

    #[test]
    fn validate_zero_extra_size() {
        let mut config = EditorConfig::default();
        config
            .export
            .extra_sizes
            .push(SizeTableEntry::new("web", "favicon", 0));
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_negative_blur() {
        let mut config = EditorConfig::default();
        config.filters.blur_sigma = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[history]\nmax_entries = 0\n").unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // size table
    // =========================================================================

    #[test]
    fn default_size_table_is_android_buckets() {
        let table = EditorConfig::default().export.size_table();
        assert_eq!(table, SizeTable::android());
    }

    #[test]
    fn size_table_combines_platforms_and_extras() {
        let export = ExportConfig {
            platforms: vec!["android".into(), "ios".into()],
            store_listing: true,
            extra_sizes: vec![SizeTableEntry::new("web", "favicon", 32)],
            ..ExportConfig::default()
        };
        let table = export.size_table();
        assert_eq!(table.len(), 5 + 1 + crate::sizes::IOS_SLOTS.len() + 1);
        assert_eq!(table.entries().last().unwrap().name, "favicon");
    }

    // =========================================================================
    // merge_toml / processing
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[export]\nsharpen = false\narchive = true\n").unwrap();
        let overlay: toml::Value = toml::from_str("[export]\nsharpen = true\n").unwrap();
        let merged = merge_toml(base, overlay);
        let export = merged.get("export").unwrap();
        assert_eq!(export.get("sharpen").unwrap().as_bool(), Some(true));
        assert_eq!(export.get("archive").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn merge_toml_array_replaces() {
        let base: toml::Value = toml::from_str("platforms = [\"android\"]").unwrap();
        let overlay: toml::Value = toml::from_str("platforms = [\"ios\"]").unwrap();
        let merged = merge_toml(base, overlay);
        let platforms = merged.get("platforms").unwrap().as_array().unwrap();
        assert_eq!(platforms.len(), 1);
        assert_eq!(platforms[0].as_str(), Some("ios"));
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ProcessingConfig {
            max_processes: Some(99999),
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: EditorConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in [
            "[canvas]",
            "[history]",
            "[input]",
            "[filters]",
            "[text]",
            "[source]",
            "[export]",
            "[processing]",
        ] {
            assert!(content.contains(section), "missing {section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for key in ["canvas", "history", "input", "filters", "source", "export", "processing"] {
            assert!(val.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn compositor_uses_reference_size() {
        let mut config = EditorConfig::default();
        config.canvas.reference_size = 256;
        let compositor = config.compositor().unwrap();
        assert_eq!(compositor.reference_size(), 256);
    }

    #[test]
    fn compositor_falls_back_to_a_system_font() {
        assert!(EditorConfig::default().compositor().unwrap().has_font());
        let mut config = EditorConfig::default();
        config.text.font_family = Some("No Such Family 12345".into());
        assert!(config.compositor().unwrap().has_font());
    }

    #[test]
    fn source_section_parses_and_validates() {
        let config: EditorConfig = toml::from_str(
            r#"
[source]
origin = "https://app.example"
max_bytes = 1024
"#,
        )
        .unwrap();
        assert_eq!(config.source.origin.as_deref(), Some("https://app.example"));
        assert_eq!(config.source.max_bytes, 1024);
        assert_eq!(config.source.timeout_secs, 30);

        let mut bad = EditorConfig::default();
        bad.source.max_bytes = 0;
        assert!(matches!(bad.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn compositor_with_missing_font_is_error() {
        let mut config = EditorConfig::default();
        config.text.font_path = Some(PathBuf::from("/nonexistent/font.ttf"));
        assert!(matches!(config.compositor(), Err(ConfigError::Font(_))));
    }
}
