//! Error types for webplayer-core.

use thiserror::Error;

/// Result type for webplayer-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in webplayer-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Extended JSON text could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Edit range does not fit the document text.
    #[error("invalid edit {from}..{to} for document of {len} bytes")]
    InvalidEdit { from: usize, to: usize, len: usize },

    /// Edit attempted through a read-only session.
    #[error("editor is read-only")]
    ReadOnly,

    /// The registry that owned the session's document has been dropped.
    #[error("document released: {0}")]
    DocumentReleased(String),

    /// The document was borrowed elsewhere when a change was attempted.
    #[error("document is busy")]
    DocumentBusy,

    /// The view was still handling a change when it was unmounted.
    #[error("view {0} is busy")]
    ViewBusy(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec(e.to_string())
    }
}
