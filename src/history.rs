//! Bounded linear undo/redo history of model snapshots.
//!
//! The history is a single ordered sequence with a cursor. The entry under
//! the cursor always mirrors what is currently rendered. Committing while
//! the cursor is not at the tail discards the redo branch first; once the
//! sequence grows past `max_entries` the oldest entry is evicted.
//!
//! ```text
//! commit A, B, C        [A, B, C*]
//! undo                  [A, B*, C]
//! commit D              [A, B, D*]      C is gone, redo is a no-op
//! ```

use crate::model::TransformModel;
use crate::source::SourceId;
use std::collections::VecDeque;

/// Default bound on retained snapshots.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// One committed state: the model plus the source it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub model: TransformModel,
    pub source: Option<SourceId>,
    /// Monotonic commit counter, unique within one history.
    pub ordinal: u64,
}

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    index: usize,
    max_entries: usize,
    next_ordinal: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl History {
    /// A history holding at most `max_entries` snapshots (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            index: 0,
            max_entries: max_entries.max(1),
            next_ordinal: 0,
        }
    }

    /// Record a settled state and move the cursor onto it.
    pub fn commit(&mut self, model: TransformModel, source: Option<SourceId>) -> &HistoryEntry {
        if !self.entries.is_empty() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push_back(HistoryEntry {
            model,
            source,
            ordinal: self.next_ordinal,
        });
        self.next_ordinal += 1;
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
        &self.entries[self.index]
    }

    /// Step back one entry. `None` when already at the oldest.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Step forward one entry. `None` when already at the newest.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.index + 1 < self.entries.len()
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Source ids referenced by any retained entry.
    pub fn referenced_sources(&self) -> impl Iterator<Item = &SourceId> {
        self.entries.iter().filter_map(|e| e.source.as_ref())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }
}
