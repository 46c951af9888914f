//! Read-once handoff of an image reference between surfaces.
//!
//! A gallery (or any other tool) can leave an image location in the slot;
//! the editor takes it on start-up, which also clears it, so a stale choice
//! is never applied twice.
//!
//! The slot is a small TOML file:
//!
//! ```toml
//! selected_example_image_url = "https://cdn.example/icons/rocket.png"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("handoff slot {path} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// On-disk contents of the slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Handoff {
    selected_example_image_url: String,
}

/// File-backed read-once slot holding one image location.
#[derive(Debug, Clone)]
pub struct HandoffSlot {
    path: PathBuf,
}

impl HandoffSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default slot location under the system temp directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("iconsmith-handoff.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `location`, replacing anything already there.
    pub fn put(&self, location: &str) -> Result<(), HandoffError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let handoff = Handoff {
            selected_example_image_url: location.trim().to_string(),
        };
        fs::write(&self.path, toml::to_string(&handoff)?)?;
        debug!(path = %self.path.display(), "handoff stored");
        Ok(())
    }

    /// Look at the stored location without consuming it.
    pub fn peek(&self) -> Result<Option<String>, HandoffError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let handoff: Handoff = toml::from_str(&content).map_err(|e| HandoffError::Malformed {
            path: self.path.clone(),
            reason: e.message().to_string(),
        })?;
        let location = handoff.selected_example_image_url.trim();
        Ok((!location.is_empty()).then(|| location.to_string()))
    }

    /// Read the stored location and clear the slot.
    ///
    /// The slot is removed even when its contents are malformed.
    pub fn take(&self) -> Result<Option<String>, HandoffError> {
        let value = self.peek();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let value = value?;
        if value.is_some() {
            debug!(path = %self.path.display(), "handoff taken");
        }
        Ok(value)
    }
}
