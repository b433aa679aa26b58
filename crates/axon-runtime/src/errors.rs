//! Engine errors.
//!
//! Only failures the caller must see surface here: a rejected concurrent
//! run, and storage failures during durability-critical writes. Tool and
//! LLM failures are converted to in-band turn outcomes instead.

use axon_context::ContextError;
use axon_history::HistoryError;
use thiserror::Error;

/// Errors surfaced from a turn.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A turn is already running for this session.
    #[error("a turn is already running for this session")]
    AlreadyRunning,

    /// A context operation failed (orphaned tool result, storage).
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A history-store operation failed.
    #[error(transparent)]
    History(#[from] HistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_history::{StorageError, StorageOperation};

    #[test]
    fn already_running_display() {
        assert!(EngineError::AlreadyRunning.to_string().contains("already running"));
    }

    #[test]
    fn storage_errors_pass_through() {
        let history: HistoryError =
            StorageError::new(StorageOperation::Append, "history:s1", "disk full").into();
        let err: EngineError = history.into();
        assert!(err.to_string().contains("disk full"));
    }
}
