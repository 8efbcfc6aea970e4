//! Error types for the execution channel.

/// Channel error type.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame refused a navigation or a posted message.
    #[error("Frame error: {0}")]
    Frame(String),

    /// A callback called back into the channel that is dispatching to it.
    #[error("Channel {0} is busy dispatching")]
    Reentrant(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;
