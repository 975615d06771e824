//! Error types for the generation engine.

/// Errors that can occur while computing a generation.
///
/// A failed computation never touches the input universe, so the caller
/// may retry with the same input.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A worker task panicked or was cancelled before finishing.
    #[error("worker failed: {0}")]
    WorkerFailed(String),

    /// The collector finished without producing a universe.
    #[error("result channel closed before the next generation was collected")]
    ChannelClosed,
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::WorkerFailed(err.to_string())
    }
}
