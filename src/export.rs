//! Multi-resolution icon export.
//!
//! Takes a frozen model snapshot, a source image and a [`SizeTable`], and
//! produces one PNG per table entry:
//!
//! ```text
//! for each entry (in parallel):  render at pixel_size → sharpen? → encode PNG
//! then (sequentially):           route every icon into the archive sink,
//!                                 plus the iOS asset catalog when iOS slots succeeded
//! ```
//!
//! ## Failure policy
//!
//! Only two conditions abort the whole export, both checked before any
//! rendering starts: no source image, and a source whose pixels may not be
//! read back (cross-origin). Everything else is per artifact: a size that
//! fails to render or encode, or an icon the archive rejects, is recorded as
//! an [`ExportFailure`] and the batch carries on. The caller always gets
//! every successful icon back individually, archive or not.
//!
//! ## Parallel Processing
//!
//! Sizes are independent, so they render on the [rayon](https://docs.rs/rayon)
//! pool. Progress goes out through an optional `mpsc` channel as each size
//! completes; results are gathered back in table order.

use crate::archive::{ArchiveError, ArchiveSink, ArchiveSummary};
use crate::imaging::{Compositor, EncodeError, RenderError, encode_png, sharpen};
use crate::model::TransformModel;
use crate::sizes::{IOS_CATALOG_PATH, SizeTable, SizeTableEntry, ios_asset_catalog};
use crate::source::SourceImage;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no image loaded")]
    NoSource,
    #[error("pixels of {0} cannot be read back (cross-origin); fix the source permissions")]
    CrossOrigin(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why one artifact failed.
#[derive(Error, Debug)]
pub enum IconError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("{0}")]
    Encode(#[from] EncodeError),
    #[error("archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error("asset catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Sharpen every icon after compositing.
    pub sharpen: bool,
}

/// Progress events sent while an export runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportEvent {
    Started { total: usize },
    Rendered { label: String, pixel_size: u32, bytes: usize },
    Failed { label: String, error: String },
    Archived { entries: usize, bytes: u64 },
}

/// One encoded icon.
#[derive(Debug, Clone)]
pub struct ExportedIcon {
    pub entry: SizeTableEntry,
    pub png: Vec<u8>,
}

impl ExportedIcon {
    pub fn archive_path(&self) -> String {
        self.entry.archive_path()
    }

    pub fn file_name(&self) -> String {
        self.entry.file_name()
    }
}

#[derive(Debug)]
pub struct ExportFailure {
    /// `platform/name` of the size, or `archive` for the archive itself.
    pub label: String,
    pub error: IconError,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    /// Successful icons in table order.
    pub icons: Vec<ExportedIcon>,
    pub failures: Vec<ExportFailure>,
    /// Present when an archive sink was given and finished cleanly.
    pub archive: Option<ArchiveSummary>,
}

impl ExportReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn send(progress: Option<&Sender<ExportEvent>>, event: ExportEvent) {
    if let Some(tx) = progress {
        // The receiver may have hung up; progress is best effort.
        tx.send(event).ok();
    }
}

/// Render, encode and route every size in `table`.
pub fn export_icons(
    compositor: &Compositor,
    model: &TransformModel,
    source: Option<&SourceImage>,
    table: &SizeTable,
    options: &ExportOptions,
    sink: Option<&mut dyn ArchiveSink>,
    progress: Option<Sender<ExportEvent>>,
) -> Result<ExportReport, ExportError> {
    let source = source.ok_or(ExportError::NoSource)?;
    if !source.is_readable() {
        return Err(ExportError::CrossOrigin(source.origin().describe()));
    }

    let progress = progress.as_ref();
    send(progress, ExportEvent::Started { total: table.len() });
    info!(sizes = table.len(), source = %source.id(), "export started");

    let results: Vec<Result<ExportedIcon, ExportFailure>> = table
        .entries()
        .par_iter()
        .map(|entry| {
            let result = render_icon(compositor, model, source, entry, options);
            match &result {
                Ok(icon) => send(
                    progress,
                    ExportEvent::Rendered {
                        label: entry.label(),
                        pixel_size: entry.pixel_size,
                        bytes: icon.png.len(),
                    },
                ),
                Err(failure) => {
                    warn!(size = %failure.label, error = %failure.error, "icon failed");
                    send(
                        progress,
                        ExportEvent::Failed {
                            label: failure.label.clone(),
                            error: failure.error.to_string(),
                        },
                    );
                }
            }
            result
        })
        .collect();

    let mut report = ExportReport::default();
    for result in results {
        match result {
            Ok(icon) => report.icons.push(icon),
            Err(failure) => report.failures.push(failure),
        }
    }

    if let Some(sink) = sink {
        archive_icons(&mut report, sink, progress);
    }

    info!(
        icons = report.icons.len(),
        failures = report.failures.len(),
        "export finished"
    );
    Ok(report)
}

fn render_icon(
    compositor: &Compositor,
    model: &TransformModel,
    source: &SourceImage,
    entry: &SizeTableEntry,
    options: &ExportOptions,
) -> Result<ExportedIcon, ExportFailure> {
    let fail = |error: IconError| ExportFailure {
        label: entry.label(),
        error,
    };
    let mut surface = compositor
        .render(model, Some(source), entry.pixel_size)
        .map_err(|e| fail(e.into()))?;
    if options.sharpen {
        surface = sharpen(&surface);
    }
    let png = encode_png(&surface).map_err(|e| fail(e.into()))?;
    debug!(size = %entry.label(), pixel_size = entry.pixel_size, bytes = png.len(), "icon encoded");
    Ok(ExportedIcon {
        entry: entry.clone(),
        png,
    })
}

fn archive_icons(
    report: &mut ExportReport,
    sink: &mut dyn ArchiveSink,
    progress: Option<&Sender<ExportEvent>>,
) {
    for icon in &report.icons {
        if let Err(e) = sink.add(&icon.archive_path(), &icon.png) {
            warn!(path = %icon.archive_path(), error = %e, "archive rejected icon");
            send(
                progress,
                ExportEvent::Failed {
                    label: icon.entry.label(),
                    error: e.to_string(),
                },
            );
            report.failures.push(ExportFailure {
                label: icon.entry.label(),
                error: e.into(),
            });
        }
    }
    let catalog = ios_asset_catalog(report.icons.iter().map(|icon| &icon.entry))
        .map_err(IconError::from)
        .and_then(|json| match json {
            Some(json) => sink
                .add(IOS_CATALOG_PATH, json.as_bytes())
                .map_err(IconError::from),
            None => Ok(()),
        });
    if let Err(e) = catalog {
        warn!(error = %e, "asset catalog not archived");
        send(
            progress,
            ExportEvent::Failed {
                label: IOS_CATALOG_PATH.to_string(),
                error: e.to_string(),
            },
        );
        report.failures.push(ExportFailure {
            label: IOS_CATALOG_PATH.to_string(),
            error: e,
        });
    }
    match sink.finish() {
        Ok(summary) => {
            send(
                progress,
                ExportEvent::Archived {
                    entries: summary.entries,
                    bytes: summary.bytes,
                },
            );
            report.archive = Some(summary);
        }
        Err(e) => {
            warn!(error = %e, "archive could not be finished");
            send(
                progress,
                ExportEvent::Failed {
                    label: "archive".to_string(),
                    error: e.to_string(),
                },
            );
            report.failures.push(ExportFailure {
                label: "archive".to_string(),
                error: e.into(),
            });
        }
    }
}

/// Save every icon as its own file under `dir`; returns the written paths.
pub fn write_individual(report: &ExportReport, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(report.icons.len());
    for icon in &report.icons {
        let path = dir.join(icon.file_name());
        std::fs::write(&path, &icon.png)?;
        written.push(path);
    }
    Ok(written)
}
