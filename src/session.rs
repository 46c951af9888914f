//! The editing session: one owner for everything a user edits.
//!
//! [`EditorSession`] holds the loaded source image, the current
//! [`TransformModel`], the reset defaults for that image, the undo/redo
//! [`History`], the rendered preview and the status messages. All mutation
//! goes through `&mut self`, so edits are strictly sequential, and several
//! sessions can live side by side without sharing anything.
//!
//! ## Edit flow
//!
//! ```text
//! apply(edit)        model' → render preview → commit to history
//! drag(edit)         model' → render if the throttle lets it through
//! tick()             render a held-back drag sample once its window passes
//! release()          render → commit            (always, never dropped)
//! undo() / redo()    restore model + source from history → render
//! ```
//!
//! Every operation that receives time takes an explicit `Instant`, which
//! drives both the drag throttle and status-message expiry.

use crate::archive::ArchiveSink;
use crate::config::{ConfigError, EditorConfig};
use crate::export::{ExportError, ExportEvent, ExportOptions, ExportReport, export_icons};
use crate::history::{History, HistoryEntry};
use crate::imaging::{Compositor, RenderError};
use crate::input::Throttle;
use crate::model::{Edit, Property, TransformModel};
use crate::sizes::SizeTable;
use crate::source::{FetchedImage, ImageSource, SourceError, SourceId, SourceImage};
use image::RgbaImage;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("history refers to image {0}, which is no longer available")]
    MissingSource(SourceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
    pub posted: Instant,
}

/// Transient user-facing messages that dismiss themselves after a TTL.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    ttl: Duration,
    messages: Vec<StatusMessage>,
}

impl StatusBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            messages: Vec::new(),
        }
    }

    /// Post a message; it is mirrored to the log at a matching level.
    pub fn post(&mut self, kind: StatusKind, text: impl Into<String>, now: Instant) {
        let text = text.into();
        match kind {
            StatusKind::Info | StatusKind::Success => info!(status = ?kind, "{text}"),
            StatusKind::Error => error!("{text}"),
        }
        self.messages.push(StatusMessage {
            kind,
            text,
            posted: now,
        });
    }

    /// Drop messages older than the TTL.
    pub fn expire(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.messages
            .retain(|m| now.saturating_duration_since(m.posted) < ttl);
    }

    /// Messages still visible at `now`, oldest first.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &StatusMessage> {
        self.messages
            .iter()
            .filter(move |m| now.saturating_duration_since(m.posted) < self.ttl)
    }

    pub fn latest(&self, now: Instant) -> Option<&StatusMessage> {
        self.visible(now).last()
    }
}

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_history: usize,
    pub throttle: Duration,
    pub status_ttl: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let config = EditorConfig::default();
        Self::from(&config)
    }
}

impl From<&EditorConfig> for SessionSettings {
    fn from(config: &EditorConfig) -> Self {
        Self {
            max_history: config.history.max_entries,
            throttle: config.input.throttle(),
            status_ttl: config.input.status_ttl(),
        }
    }
}

pub struct EditorSession {
    compositor: Compositor,
    source: Option<SourceImage>,
    /// Every source a retained history entry may need to restore.
    sources: HashMap<SourceId, SourceImage>,
    defaults: TransformModel,
    model: TransformModel,
    history: History,
    throttle: Throttle,
    dragging: bool,
    status: StatusBoard,
    preview: RgbaImage,
}

impl EditorSession {
    /// A session with no image, showing the placeholder.
    pub fn new(compositor: Compositor, settings: SessionSettings) -> Result<Self, SessionError> {
        let defaults = TransformModel::defaults_for(None, compositor.reference_size());
        let preview = compositor.render(&defaults, None, compositor.reference_size())?;
        Ok(Self {
            compositor,
            source: None,
            sources: HashMap::new(),
            model: defaults.clone(),
            defaults,
            history: History::new(settings.max_history),
            throttle: Throttle::new(settings.throttle),
            dragging: false,
            status: StatusBoard::new(settings.status_ttl),
            preview,
        })
    }

    pub fn from_config(config: &EditorConfig) -> Result<Self, SessionError> {
        Self::new(config.compositor()?, SessionSettings::from(config))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn model(&self) -> &TransformModel {
        &self.model
    }

    pub fn defaults(&self) -> &TransformModel {
        &self.defaults
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn image_loaded(&self) -> bool {
        self.source.is_some()
    }

    pub fn preview(&self) -> &RgbaImage {
        &self.preview
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Decode and adopt a new source image.
    ///
    /// On failure nothing changes except an error status message.
    pub fn load_image(&mut self, fetched: FetchedImage, now: Instant) -> Result<(), SessionError> {
        let image = match SourceImage::decode(fetched) {
            Ok(image) => image,
            Err(e) => {
                self.status
                    .post(StatusKind::Error, format!("Could not load image: {e}"), now);
                return Err(e.into());
            }
        };

        let reference = self.compositor.reference_size();
        let defaults = TransformModel::defaults_for(Some(image.dimensions()), reference);
        let preview = self.compositor.render(&defaults, Some(&image), reference)?;

        self.sources.insert(image.id().clone(), image.clone());
        self.source = Some(image);
        self.defaults = defaults.clone();
        self.model = defaults;
        self.preview = preview;
        self.end_drag();
        self.commit();
        self.status.post(StatusKind::Success, "Image loaded", now);
        Ok(())
    }

    /// Fetch `location` from `provider` and load it.
    pub fn load_from(
        &mut self,
        provider: &impl ImageSource,
        location: &str,
        now: Instant,
    ) -> Result<(), SessionError> {
        match provider.fetch(location) {
            Ok(fetched) => self.load_image(fetched, now),
            Err(e) => {
                self.status
                    .post(StatusKind::Error, format!("Could not fetch {location}: {e}"), now);
                Err(e.into())
            }
        }
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// A settled change: render and commit.
    pub fn apply(&mut self, edit: &Edit) -> Result<(), SessionError> {
        self.model = self.model.apply(edit);
        self.end_drag();
        self.render()?;
        self.commit();
        Ok(())
    }

    /// An intermediate drag sample. Returns true if the preview was re-rendered.
    pub fn drag(&mut self, edit: &Edit, now: Instant) -> Result<bool, SessionError> {
        self.model = self.model.apply(edit);
        self.dragging = true;
        if self.throttle.sample(now) {
            self.render()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Periodic tick: flushes a held-back drag sample and expires status messages.
    pub fn tick(&mut self, now: Instant) -> Result<bool, SessionError> {
        self.status.expire(now);
        if self.throttle.tick(now) {
            self.render()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// The drag ended: the final value is always rendered and committed.
    pub fn release(&mut self) -> Result<(), SessionError> {
        self.end_drag();
        self.render()?;
        self.commit();
        Ok(())
    }

    /// Restore one property to this image's default.
    pub fn reset_property(&mut self, property: Property) -> Result<(), SessionError> {
        self.model = self.model.reset_property(property, &self.defaults);
        self.end_drag();
        self.render()?;
        self.commit();
        Ok(())
    }

    /// Restore every property to this image's defaults.
    ///
    /// With `preserve_history` the reset is one more undoable step; without
    /// it the history restarts from the reset state.
    pub fn reset(&mut self, preserve_history: bool, now: Instant) -> Result<(), SessionError> {
        self.model = self.defaults.clone();
        self.end_drag();
        if !preserve_history {
            self.history.clear();
        }
        self.render()?;
        self.commit();
        self.status.post(StatusKind::Info, "All settings reset", now);
        Ok(())
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    /// Step back. Returns false when there is nothing to undo.
    ///
    /// A drag still in progress is committed first, so undo lands on the
    /// state before it.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        self.settle_drag()?;
        match self.history.undo().cloned() {
            Some(entry) => self.restore(entry).map(|()| true),
            None => Ok(false),
        }
    }

    /// Step forward. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool, SessionError> {
        self.settle_drag()?;
        match self.history.redo().cloned() {
            Some(entry) => self.restore(entry).map(|()| true),
            None => Ok(false),
        }
    }

    fn restore(&mut self, entry: HistoryEntry) -> Result<(), SessionError> {
        let current = self.source.as_ref().map(|s| s.id().clone());
        if entry.source != current {
            let source = match &entry.source {
                Some(id) => Some(
                    self.sources
                        .get(id)
                        .cloned()
                        .ok_or_else(|| SessionError::MissingSource(id.clone()))?,
                ),
                None => None,
            };
            let reference = self.compositor.reference_size();
            self.defaults =
                TransformModel::defaults_for(source.as_ref().map(SourceImage::dimensions), reference);
            self.source = source;
        }
        self.model = entry.model;
        self.render()
    }

    fn commit(&mut self) {
        let id = self.source.as_ref().map(|s| s.id().clone());
        self.history.commit(self.model.clone(), id);
        self.prune_sources();
    }

    /// Forget decoded sources no history entry can reach any more.
    fn prune_sources(&mut self) {
        let live: HashSet<SourceId> = self.history.referenced_sources().cloned().collect();
        self.sources.retain(|id, _| live.contains(id));
    }

    fn settle_drag(&mut self) -> Result<(), SessionError> {
        if self.dragging {
            self.release()?;
        }
        Ok(())
    }

    fn end_drag(&mut self) {
        self.dragging = false;
        self.throttle.settle();
    }

    fn render(&mut self) -> Result<(), SessionError> {
        self.preview = self.compositor.render(
            &self.model,
            self.source.as_ref(),
            self.compositor.reference_size(),
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Export the current state. The model is snapshotted before rendering
    /// starts and the history is never touched.
    pub fn export(
        &mut self,
        table: &SizeTable,
        options: &ExportOptions,
        sink: Option<&mut dyn ArchiveSink>,
        progress: Option<Sender<ExportEvent>>,
        now: Instant,
    ) -> Result<ExportReport, SessionError> {
        let snapshot = self.model.clone();
        self.status
            .post(StatusKind::Info, format!("Exporting {} icons", table.len()), now);
        let result = export_icons(
            &self.compositor,
            &snapshot,
            self.source.as_ref(),
            table,
            options,
            sink,
            progress,
        );
        match result {
            Ok(report) => {
                if report.is_complete() {
                    self.status.post(
                        StatusKind::Success,
                        format!("Exported {} icons", report.icons.len()),
                        now,
                    );
                } else {
                    warn!(failures = report.failures.len(), "export finished with failures");
                    self.status.post(
                        StatusKind::Error,
                        format!(
                            "Exported {} icons, {} failed",
                            report.icons.len(),
                            report.failures.len()
                        ),
                        now,
                    );
                }
                Ok(report)
            }
            Err(e) => {
                let text = match &e {
                    ExportError::NoSource => "Load an image before exporting".to_string(),
                    other => format!("Export failed: {other}"),
                };
                self.status.post(StatusKind::Error, text, now);
                Err(e.into())
            }
        }
    }
}
