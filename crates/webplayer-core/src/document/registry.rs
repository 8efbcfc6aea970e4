//! In-memory document cache owned by the host application.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::{DocumentKey, LanguageMode, ObserverRef, SharedDocument, TextDocument, ViewId};

/// Cache of documents keyed by [`DocumentKey`].
///
/// A document is created at most once per key, on first access, and lives
/// until the registry is dropped. There is no eviction.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: FxHashMap<DocumentKey, SharedDocument>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the document for `key`, creating it from `initial_content` if absent.
    ///
    /// The first caller wins: later calls with different content or mode get the
    /// existing document unchanged.
    pub fn get_or_create(
        &mut self,
        key: impl Into<DocumentKey>,
        initial_content: &str,
        mode: LanguageMode,
    ) -> SharedDocument {
        let key = key.into();
        self.documents
            .entry(key)
            .or_insert_with_key(|key| {
                tracing::debug!("Creating document {} ({} bytes)", key, initial_content.len());
                Rc::new(RefCell::new(TextDocument::new(
                    key.clone(),
                    initial_content,
                    mode,
                )))
            })
            .clone()
    }

    pub fn get(&self, key: &DocumentKey) -> Option<SharedDocument> {
        self.documents.get(key).cloned()
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.documents.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Attach a new view sharing the document's undo history.
    ///
    /// `observer` is told about every change committed through
    /// [`commit`](super::commit) until the view is unlinked.
    pub fn link_view(&self, document: &SharedDocument, observer: ObserverRef) -> ViewId {
        let mut document = document.borrow_mut();
        let view = document.link_view(observer);
        tracing::debug!(
            "Linked {} to {} ({} linked)",
            view,
            document.key(),
            document.linked_views()
        );
        view
    }

    /// Detach a view. Returns `false` if the view was not linked.
    pub fn unlink_view(&self, document: &SharedDocument, view: ViewId) -> bool {
        let mut document = document.borrow_mut();
        let unlinked = document.unlink_view(view);
        if unlinked {
            tracing::debug!(
                "Unlinked {} from {} ({} linked)",
                view,
                document.key(),
                document.linked_views()
            );
        } else {
            tracing::warn!("{} is not linked to {}", view, document.key());
        }
        unlinked
    }
}
