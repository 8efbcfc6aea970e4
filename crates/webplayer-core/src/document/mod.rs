//! Document registry.
//!
//! Maps a document key (usually a filename) to a shared buffer that outlives
//! any single editor. Editors attach to a buffer as linked views that share
//! one undo history.

mod history;
mod observer;
mod registry;
mod text;

pub use history::{Change, HistorySize};
pub use observer::{DocumentObserver, ObserverRef, commit};
pub use registry::DocumentRegistry;
pub use text::{Edit, LanguageMode, TextDocument, ViewId};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A buffer shared between the registry and the sessions viewing it.
pub type SharedDocument = Rc<RefCell<TextDocument>>;

/// Registry key for a document.
///
/// The bare filename is the key by default. Hosts embedding several unrelated
/// workspaces in one registry add a namespace so that two `App.js` files do
/// not share content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentKey {
    pub namespace: Option<String>,
    pub filename: String,
}

impl DocumentKey {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            namespace: None,
            filename: filename.into(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

impl From<&str> for DocumentKey {
    fn from(filename: &str) -> Self {
        Self::new(filename)
    }
}

impl From<String> for DocumentKey {
    fn from(filename: String) -> Self {
        Self::new(filename)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}:{}", namespace, self.filename),
            None => f.write_str(&self.filename),
        }
    }
}
