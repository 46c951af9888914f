//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every icon is shown by its identity first (`platform/name` and pixel
//! size), with the archive path or written file as indented context. Sizes
//! and byte counts are right-aligned so a column of icons reads as a table.
//!
//! # Output Format
//!
//! ## Sizes
//!
//! ```text
//! android
//!        48px  mdpi → res/drawable-mdpi/ic_launcher.png
//!        72px  hdpi → res/drawable-hdpi/ic_launcher.png
//! ios
//!       180px  AppIcon60x60@3x → ios/AppIcon.appiconset/AppIcon60x60@3x.png
//! ```
//!
//! ## Export
//!
//! ```text
//! Exporting 5 icons
//!     android/mdpi (48px): 1.2 KB
//!     android/xhdpi: FAILED render error: canvas is empty
//! Archived 4 entries (21.0 KB)
//!
//! Exported 4 of 5 icons
//!     Archive: out/icons.zip
//!     Failed: android/xhdpi
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::export::{ExportEvent, ExportReport};
use crate::model::TransformModel;
use crate::session::{StatusKind, StatusMessage};
use crate::sizes::SizeTable;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count.
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{} B", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

// ============================================================================
// Size table
// ============================================================================

/// Format the size table grouped by platform, in table order.
pub fn format_size_table(table: &SizeTable) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<&str> = None;
    for entry in table {
        if current != Some(entry.platform.as_str()) {
            lines.push(entry.platform.clone());
            current = Some(entry.platform.as_str());
        }
        lines.push(format!(
            "{}{:>5}px  {} \u{2192} {}",
            indent(1),
            entry.pixel_size,
            entry.name,
            entry.archive_path()
        ));
    }
    lines
}

pub fn print_size_table(table: &SizeTable) {
    for line in format_size_table(table) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

/// Format one progress event.
pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match event {
        ExportEvent::Started { total } => vec![format!("Exporting {} icons", total)],
        ExportEvent::Rendered {
            label,
            pixel_size,
            bytes,
        } => vec![format!(
            "{}{} ({}px): {}",
            indent(1),
            label,
            pixel_size,
            format_bytes(*bytes as u64)
        )],
        ExportEvent::Failed { label, error } => {
            vec![format!("{}{}: FAILED {}", indent(1), label, error)]
        }
        ExportEvent::Archived { entries, bytes } => vec![format!(
            "Archived {} entries ({})",
            entries,
            format_bytes(*bytes)
        )],
    }
}

/// Format the closing summary of an export.
///
/// `written` lists individually written files; `archive` is the archive file,
/// if one was produced.
pub fn format_export_report(
    report: &ExportReport,
    written: &[PathBuf],
    archive: Option<&Path>,
) -> Vec<String> {
    let total = report.icons.len() + report.failures.len();
    let mut lines = vec![String::new()];
    if report.is_complete() {
        lines.push(format!("Exported {} icons", report.icons.len()));
    } else {
        lines.push(format!("Exported {} of {} icons", report.icons.len(), total));
    }
    if let Some(path) = archive {
        lines.push(format!("{}Archive: {}", indent(1), path.display()));
    }
    if !written.is_empty() {
        lines.push(format!("{}Files: {}", indent(1), written.len()));
    }
    for failure in &report.failures {
        lines.push(format!("{}Failed: {}", indent(1), failure.label));
    }
    lines
}

pub fn print_export_report(report: &ExportReport, written: &[PathBuf], archive: Option<&Path>) {
    for line in format_export_report(report, written, archive) {
        println!("{}", line);
    }
}

// ============================================================================
// Model and status
// ============================================================================

/// Format the editable properties of a model, one per line.
pub fn format_model(model: &TransformModel) -> Vec<String> {
    let mut lines = vec![
        format!("scale: {:.3}", model.scale),
        format!("rotation: {}\u{b0}", model.display_rotation()),
        format!("offset: {}, {}", model.x_offset, model.y_offset),
        format!("background: {}", model.background_color),
        format!("padding: {}", model.padding),
        format!("shape: {}", model.icon_shape),
        format!("filter: {}", model.filter),
    ];
    if model.border_width > 0.0 {
        lines.push(format!(
            "border: {}px {}",
            model.border_width, model.border_color
        ));
    }
    if !model.text.is_empty() {
        lines.push(format!(
            "text: \"{}\" {}px {}",
            model.text.content, model.text.font_size, model.text.font_color
        ));
    }
    lines
}

pub fn print_model(model: &TransformModel) {
    for line in format_model(model) {
        println!("{}", line);
    }
}

pub fn format_status(message: &StatusMessage) -> String {
    let tag = match message.kind {
        StatusKind::Info => "info",
        StatusKind::Success => "ok",
        StatusKind::Error => "error",
    };
    format!("[{}] {}", tag, message.text)
}

// ============================================================================
// Tests
// ============================================================================
