//! Host-supplied editor properties.

use serde::{Deserialize, Serialize};

use crate::document::{DocumentKey, LanguageMode};

/// Inclusive range of 0-based lines, written as `[from, to]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct LineRange {
    pub from: usize,
    pub to: usize,
}

impl LineRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Every line in the range. Empty when `from > to`.
    pub fn lines(self) -> std::ops::RangeInclusive<usize> {
        self.from..=self.to
    }
}

impl From<(usize, usize)> for LineRange {
    fn from((from, to): (usize, usize)) -> Self {
        Self { from, to }
    }
}

impl From<LineRange> for (usize, usize) {
    fn from(range: LineRange) -> Self {
        (range.from, range.to)
    }
}

/// Properties an editor is mounted and updated with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorProps {
    /// Registry key; editors with the same filename share a document.
    pub filename: String,
    /// Optional registry namespace for the filename.
    pub namespace: Option<String>,
    /// Content for a document created by this mount.
    pub initial_value: Option<String>,
    /// Externally driven content; replaces the document when it differs.
    pub value: Option<String>,
    pub mode: LanguageMode,
    pub read_only: bool,
    pub show_diff: bool,
    /// Changed line ranges, in document order.
    pub diff: Vec<LineRange>,
    pub error_line_number: Option<usize>,
}

impl EditorProps {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn document_key(&self) -> DocumentKey {
        let key = DocumentKey::new(self.filename.clone());
        match &self.namespace {
            Some(namespace) => key.in_namespace(namespace.clone()),
            None => key,
        }
    }

    /// Seed content: `initial_value`, else `value`, else empty. Empty strings fall through.
    pub fn seed_content(&self) -> &str {
        [self.initial_value.as_deref(), self.value.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_default()
    }
}
