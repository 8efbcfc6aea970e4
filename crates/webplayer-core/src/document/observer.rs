//! Change propagation to linked views.

use std::rc::Weak;

use crate::error::{Error, Result};

use super::{SharedDocument, TextDocument};

/// A linked view that redraws when the shared text changes.
pub trait DocumentObserver {
    /// Called after a change commits, with the new text and revision.
    ///
    /// Runs with the document released, so the observer may read it or start
    /// another change. Revisions only grow; an observer that has already shown
    /// `revision` or a later one ignores the call.
    fn document_changed(&self, text: &str, revision: u64);
}

/// Weak handle the document keeps for each linked view.
pub type ObserverRef = Weak<dyn DocumentObserver>;

/// Run `change` against the document, then notify every linked view.
///
/// Nothing is notified when `change` fails or leaves the text as it was.
pub fn commit(
    document: &SharedDocument,
    change: impl FnOnce(&mut TextDocument) -> Result<bool>,
) -> Result<bool> {
    let (observers, text, revision) = {
        let mut doc = document
            .try_borrow_mut()
            .map_err(|_| Error::DocumentBusy)?;
        if !change(&mut *doc)? {
            return Ok(false);
        }
        (doc.observers(), doc.text().to_string(), doc.revision())
    };

    for observer in observers.iter().filter_map(Weak::upgrade) {
        observer.document_changed(&text, revision);
    }
    Ok(true)
}

#[cfg(test)]
pub(crate) struct NullObserver;

#[cfg(test)]
impl DocumentObserver for NullObserver {
    fn document_changed(&self, _text: &str, _revision: u64) {}
}

/// Handle for tests that link views nobody watches.
#[cfg(test)]
pub(crate) fn unobserved() -> ObserverRef {
    Weak::<NullObserver>::new()
}
