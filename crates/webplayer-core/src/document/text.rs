//! Shared-history text buffer.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::history::{Change, History, HistorySize};
use super::DocumentKey;
use super::observer::ObserverRef;

/// Syntax mode name handed to the editing surface (e.g. `jsx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageMode(String);

impl LanguageMode {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageMode {
    fn default() -> Self {
        Self::new("jsx")
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of a view linked to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Replace the byte range `from..to` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub from: usize,
    pub to: usize,
    pub text: String,
}

impl Edit {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            from: at,
            to: at,
            text: text.into(),
        }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Self {
            from,
            to,
            text: String::new(),
        }
    }

    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        Self {
            from,
            to,
            text: text.into(),
        }
    }
}

/// A document buffer: text, mode, one undo history and the set of linked views.
///
/// The buffer is the arena; views are ids into it. Every linked view edits the
/// same text and the same history, so an undo from one view reverts a change
/// made through another.
#[derive(Debug)]
pub struct TextDocument {
    key: DocumentKey,
    text: String,
    mode: LanguageMode,
    history: History,
    views: FxHashMap<ViewId, ObserverRef>,
    next_view: u64,
    /// Bumped on every text change.
    revision: u64,
}

impl TextDocument {
    pub fn new(key: DocumentKey, text: impl Into<String>, mode: LanguageMode) -> Self {
        Self {
            key,
            text: text.into(),
            mode,
            history: History::new(),
            views: FxHashMap::default(),
            next_view: 0,
            revision: 0,
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> &LanguageMode {
        &self.mode
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn history_size(&self) -> HistorySize {
        self.history.size()
    }

    /// Number of views currently linked.
    pub fn linked_views(&self) -> usize {
        self.views.len()
    }

    pub fn is_linked(&self, view: ViewId) -> bool {
        self.views.contains_key(&view)
    }

    pub(crate) fn link_view(&mut self, observer: ObserverRef) -> ViewId {
        let view = ViewId(self.next_view);
        self.next_view += 1;
        self.views.insert(view, observer);
        view
    }

    pub(crate) fn unlink_view(&mut self, view: ViewId) -> bool {
        self.views.remove(&view).is_some()
    }

    /// Observers of the linked views, oldest view first.
    pub(crate) fn observers(&self) -> Vec<ObserverRef> {
        let mut views: Vec<_> = self.views.iter().collect();
        views.sort_unstable_by_key(|(view, _)| **view);
        views.into_iter().map(|(_, observer)| observer.clone()).collect()
    }

    /// Apply an edit and record it in the shared history.
    ///
    /// Returns `false` when the edit leaves the text unchanged (nothing is recorded).
    pub fn apply(&mut self, edit: Edit) -> Result<bool> {
        let Edit { from, to, text } = edit;
        if from > to
            || to > self.text.len()
            || !self.text.is_char_boundary(from)
            || !self.text.is_char_boundary(to)
        {
            return Err(Error::InvalidEdit {
                from,
                to,
                len: self.text.len(),
            });
        }

        if self.text[from..to] == text {
            return Ok(false);
        }

        let removed = self.text[from..to].to_string();
        self.text.replace_range(from..to, &text);
        self.revision += 1;
        self.history.record(Change {
            from,
            removed,
            inserted: text,
        });
        Ok(true)
    }

    /// Replace the whole text, recorded as a single undoable change.
    pub fn set_value(&mut self, text: impl Into<String>) -> bool {
        let len = self.text.len();
        // Whole-document range is always valid.
        self.apply(Edit::replace(0, len, text)).unwrap_or(false)
    }

    /// Revert the newest change. Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(change) = self.history.undo() else {
            return false;
        };
        let range = change.inserted_range();
        let restored = change.removed.clone();
        self.text.replace_range(range, &restored);
        self.revision += 1;
        true
    }

    /// Reapply the newest undone change. Returns `false` if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(change) = self.history.redo() else {
            return false;
        };
        let range = change.removed_range();
        let inserted = change.inserted.clone();
        self.text.replace_range(range, &inserted);
        self.revision += 1;
        true
    }
}
