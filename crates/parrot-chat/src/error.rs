//! Error types for the chat layer.

use parrot_core::error::ParrotError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),
    #[error("agent error: {0}")]
    Agent(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("export error: {0}")]
    Export(String),
    #[error("unsupported export format: {0}")]
    UnsupportedExportFormat(String),
    #[error("input error: {0}")]
    Input(String),
    /// The user interrupted a turn while it was being processed.
    #[error("interrupted")]
    Interrupted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(ParrotError),
}

impl From<ParrotError> for ChatError {
    fn from(err: ParrotError) -> Self {
        match err {
            ParrotError::Io(e) => ChatError::Io(e),
            ParrotError::Storage(msg) => ChatError::Storage(msg),
            other => ChatError::Core(other),
        }
    }
}
