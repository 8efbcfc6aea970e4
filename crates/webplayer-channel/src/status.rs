//! Readiness tracking for the player runtime.

use serde::{Deserialize, Serialize};

use crate::protocol::{FileMap, RunMessage};

/// Runtime lifecycle. Only ever moves from `Loading` to `Ready`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeStatus {
    #[default]
    Loading,
    Ready,
}

/// A run the host asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub file_map: FileMap,
    pub entry: String,
}

impl RunRequest {
    pub fn new(file_map: FileMap, entry: impl Into<String>) -> Self {
        Self {
            file_map,
            entry: entry.into(),
        }
    }

    pub fn into_message(self) -> RunMessage {
        RunMessage::new(self.file_map, self.entry)
    }
}

/// Result of a `ready` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyTransition {
    /// The runtime just became ready; carries the buffered run, if any.
    Entered(Option<RunRequest>),
    /// Already ready. Nothing to do.
    Ignored,
}

/// Tracks readiness and holds at most one run until the runtime is ready.
#[derive(Debug, Default)]
pub struct RuntimeHandle {
    status: RuntimeStatus,
    pending: Option<RunRequest>,
}

impl RuntimeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> RuntimeStatus {
        self.status
    }

    /// The run waiting for readiness.
    pub fn pending(&self) -> Option<&RunRequest> {
        self.pending.as_ref()
    }

    /// Submit a run. Returns it back when it should be posted now; while
    /// loading it replaces whatever was buffered and `None` is returned.
    pub fn request_run(&mut self, request: RunRequest) -> Option<RunRequest> {
        match self.status {
            RuntimeStatus::Loading => {
                if self.pending.replace(request).is_some() {
                    tracing::debug!("Replacing buffered run request");
                }
                None
            }
            RuntimeStatus::Ready => Some(request),
        }
    }

    /// Record a `ready` event.
    pub fn mark_ready(&mut self) -> ReadyTransition {
        match self.status {
            RuntimeStatus::Loading => {
                self.status = RuntimeStatus::Ready;
                ReadyTransition::Entered(self.pending.take())
            }
            RuntimeStatus::Ready => ReadyTransition::Ignored,
        }
    }

    /// Drop the buffered run, returning it.
    pub fn discard(&mut self) -> Option<RunRequest> {
        self.pending.take()
    }
}
