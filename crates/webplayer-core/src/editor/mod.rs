//! Editor sessions.
//!
//! An [`EditorSession`] binds an [`EditingSurface`] to a registry document for
//! the lifetime of a mounted view, and draws error markers and diff
//! highlights on it.

mod props;
mod session;
mod surface;

pub use props::{EditorProps, LineRange};
pub use session::EditorSession;
pub use surface::{
    CHANGED_LINE_CLASS, ERROR_LINE_CLASS, EditingSurface, HeadlessSurface, LineLayer, ScrollInfo,
};
