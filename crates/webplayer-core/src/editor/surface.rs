//! The editing surface an [`EditorSession`](super::EditorSession) drives.

use std::collections::BTreeSet;

use crate::document::LanguageMode;

/// Line class marking lines that differ from the reference version.
pub const CHANGED_LINE_CLASS: &str = "cm-line-changed";

/// Line class marking the line a runtime error points at.
pub const ERROR_LINE_CLASS: &str = "cm-line-error";

/// Where a line class is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineLayer {
    /// The line number gutter.
    Gutter,
    /// Behind the line's text.
    Background,
}

/// Viewport geometry, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollInfo {
    pub top: f64,
    pub client_height: f64,
}

/// A text editing widget.
///
/// Rendering and input handling live behind this trait. Lines are 0-based.
/// Line classes are visual only and never touch document text; adding a class
/// a line already carries is a no-op.
pub trait EditingSurface {
    /// Show a document. Called on mount and, with an empty disposable
    /// document, on unmount.
    fn attach(&mut self, text: &str, mode: &LanguageMode, read_only: bool);

    /// Redisplay the attached document after its text changed.
    fn display(&mut self, text: &str);

    /// Text currently shown.
    fn content(&self) -> String;

    fn set_read_only(&mut self, read_only: bool);

    fn add_line_class(&mut self, line: usize, layer: LineLayer, class: &str);

    fn remove_line_class(&mut self, line: usize, layer: LineLayer, class: &str);

    fn scroll_info(&self) -> ScrollInfo;

    /// Vertical offset of the top of `line` within the document.
    fn height_at_line(&self, line: usize) -> f64;

    /// Scroll so `line` is visible with at least `margin` pixels around it.
    fn scroll_into_view(&mut self, line: usize, margin: f64);
}

/// A surface with fixed line height that records what it was asked to draw.
///
/// Used for headless sessions (no widget attached) and in tests.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    pub text: String,
    pub mode: Option<LanguageMode>,
    pub read_only: bool,
    pub line_height: f64,
    pub client_height: f64,
    /// Current line classes.
    pub classes: BTreeSet<(usize, LineLayer, String)>,
    /// Every `scroll_into_view` call as `(line, margin)`.
    pub scrolls: Vec<(usize, f64)>,
}

impl HeadlessSurface {
    pub fn new(line_height: f64, client_height: f64) -> Self {
        Self {
            text: String::new(),
            mode: None,
            read_only: false,
            line_height,
            client_height,
            classes: BTreeSet::new(),
            scrolls: Vec::new(),
        }
    }

    /// Lines carrying `class` on `layer`, in order.
    pub fn lines_with(&self, layer: LineLayer, class: &str) -> Vec<usize> {
        self.classes
            .iter()
            .filter(|(_, l, c)| *l == layer && c == class)
            .map(|(line, _, _)| *line)
            .collect()
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new(20.0, 400.0)
    }
}

impl EditingSurface for HeadlessSurface {
    fn attach(&mut self, text: &str, mode: &LanguageMode, read_only: bool) {
        self.text = text.to_string();
        self.mode = Some(mode.clone());
        self.read_only = read_only;
        // Line classes belong to the previously shown document.
        self.classes.clear();
    }

    fn display(&mut self, text: &str) {
        self.text = text.to_string();
    }

    fn content(&self) -> String {
        self.text.clone()
    }

    fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn add_line_class(&mut self, line: usize, layer: LineLayer, class: &str) {
        self.classes.insert((line, layer, class.to_string()));
    }

    fn remove_line_class(&mut self, line: usize, layer: LineLayer, class: &str) {
        self.classes.remove(&(line, layer, class.to_string()));
    }

    fn scroll_info(&self) -> ScrollInfo {
        ScrollInfo {
            top: 0.0,
            client_height: self.client_height,
        }
    }

    fn height_at_line(&self, line: usize) -> f64 {
        line as f64 * self.line_height
    }

    fn scroll_into_view(&mut self, line: usize, margin: f64) {
        self.scrolls.push((line, margin));
    }
}
