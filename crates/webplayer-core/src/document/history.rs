//! Undo/redo history shared by every view linked to a document.
//!
//! Records text changes and allows undoing/redoing them from any view.

/// Maximum number of undo operations to track.
const MAX_UNDO_HISTORY: usize = 200;

/// A recorded text change. Undo = put `removed` back where `inserted` sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    /// Byte offset where the change starts.
    pub from: usize,
    /// Text that was replaced.
    pub removed: String,
    /// Text that replaced it.
    pub inserted: String,
}

impl Change {
    /// Byte range currently occupied by the inserted text.
    pub fn inserted_range(&self) -> std::ops::Range<usize> {
        self.from..self.from + self.inserted.len()
    }

    /// Byte range occupied by the removed text once it is restored.
    pub fn removed_range(&self) -> std::ops::Range<usize> {
        self.from..self.from + self.removed.len()
    }
}

/// Number of steps available in each direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySize {
    pub undo: usize,
    pub redo: usize,
}

/// Linear undo/redo stacks.
#[derive(Debug, Default)]
pub struct History {
    /// Stack of changes that can be undone.
    undo_stack: Vec<Change>,
    /// Stack of changes that can be redone.
    redo_stack: Vec<Change>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change that was just applied.
    ///
    /// This clears the redo stack (can't redo after a new change).
    pub fn record(&mut self, change: Change) {
        self.redo_stack.clear();
        self.undo_stack.push(change);

        while self.undo_stack.len() > MAX_UNDO_HISTORY {
            self.undo_stack.remove(0);
        }
    }

    /// Move the newest change onto the redo stack and return it.
    ///
    /// The caller reverts the returned change in the text.
    pub fn undo(&mut self) -> Option<&Change> {
        let change = self.undo_stack.pop()?;
        self.redo_stack.push(change);
        self.redo_stack.last()
    }

    /// Move the newest undone change back onto the undo stack and return it.
    ///
    /// The caller reapplies the returned change in the text.
    pub fn redo(&mut self) -> Option<&Change> {
        let change = self.redo_stack.pop()?;
        self.undo_stack.push(change);
        self.undo_stack.last()
    }

    pub fn size(&self) -> HistorySize {
        HistorySize {
            undo: self.undo_stack.len(),
            redo: self.redo_stack.len(),
        }
    }
}
