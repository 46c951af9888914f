//! Destinations for exported icons.
//!
//! The export orchestrator hands every encoded icon to an [`ArchiveSink`] as
//! a `(path, bytes)` pair and calls [`ArchiveSink::finish`] once. Two sinks
//! ship with the crate:
//!
//! - [`ZipSink`]: a single deflated ZIP archive over any `Write + Seek`
//! - [`DirectorySink`]: files written under a root directory, one per path

use std::fs;
use std::io::{Seek, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid archive path: {0}")]
    InvalidPath(String),
    #[error("archive already finished")]
    Finished,
}

/// What a sink wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub bytes: u64,
}

pub trait ArchiveSink {
    fn add(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError>;
    fn finish(&mut self) -> Result<ArchiveSummary, ArchiveError>;
}

/// Archive paths are relative, `/`-separated, and never climb out of the root.
fn check_path(path: &str) -> Result<(), ArchiveError> {
    let p = Path::new(path);
    let clean = !path.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_)));
    if clean {
        Ok(())
    } else {
        Err(ArchiveError::InvalidPath(path.to_string()))
    }
}

/// Deflated ZIP archive.
pub struct ZipSink<W: Write + Seek> {
    writer: Option<ZipWriter<W>>,
    inner: Option<W>,
    options: SimpleFileOptions,
    entries: usize,
    bytes: u64,
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: Some(ZipWriter::new(out)),
            inner: None,
            options: SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated),
            entries: 0,
            bytes: 0,
        }
    }

    /// The underlying writer, available once the archive is finished.
    pub fn into_inner(self) -> Option<W> {
        self.inner
    }
}

impl<W: Write + Seek> ArchiveSink for ZipSink<W> {
    fn add(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        check_path(path)?;
        let zip = self.writer.as_mut().ok_or(ArchiveError::Finished)?;
        zip.start_file(path, self.options)?;
        zip.write_all(bytes)?;
        self.entries += 1;
        self.bytes += bytes.len() as u64;
        debug!(path, size = bytes.len(), "zip entry added");
        Ok(())
    }

    fn finish(&mut self) -> Result<ArchiveSummary, ArchiveError> {
        let zip = self.writer.take().ok_or(ArchiveError::Finished)?;
        self.inner = Some(zip.finish()?);
        Ok(ArchiveSummary {
            entries: self.entries,
            bytes: self.bytes,
        })
    }
}

/// Writes each entry as a file below `root`, creating directories as needed.
#[derive(Debug)]
pub struct DirectorySink {
    root: PathBuf,
    entries: usize,
    bytes: u64,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: 0,
            bytes: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArchiveSink for DirectorySink {
    fn add(&mut self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        check_path(path)?;
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;
        self.entries += 1;
        self.bytes += bytes.len() as u64;
        Ok(())
    }

    fn finish(&mut self) -> Result<ArchiveSummary, ArchiveError> {
        Ok(ArchiveSummary {
            entries: self.entries,
            bytes: self.bytes,
        })
    }
}
