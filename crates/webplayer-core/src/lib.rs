//! Core engine for the web player workspace.
//!
//! This crate provides:
//! - Extended JSON codec for values plain JSON cannot carry across a frame boundary
//! - Document registry with shared-history buffers and linked views
//! - Editor sessions binding an editing surface to a registry buffer

pub mod document;
pub mod editor;
pub mod ejson;
pub mod error;

pub use document::{
    DocumentKey, DocumentObserver, DocumentRegistry, Edit, HistorySize, LanguageMode,
    SharedDocument, TextDocument, ViewId,
};
pub use editor::{
    CHANGED_LINE_CLASS, ERROR_LINE_CLASS, EditingSurface, EditorProps, EditorSession,
    HeadlessSurface, LineLayer, LineRange, ScrollInfo,
};
pub use ejson::Value;
pub use error::{Error, Result};
