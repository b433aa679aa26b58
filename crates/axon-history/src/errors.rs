//! History subsystem errors.

use axon_core::ids::MessageId;
use thiserror::Error;

/// The backing-store operation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageOperation {
    /// Appending an item to a log.
    Append,
    /// Reading a range from a log.
    Range,
    /// Deleting a key.
    Delete,
    /// Reading a value.
    Get,
    /// Writing a value.
    Set,
}

impl std::fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append => write!(f, "append"),
            Self::Range => write!(f, "range"),
            Self::Delete => write!(f, "delete"),
            Self::Get => write!(f, "get"),
            Self::Set => write!(f, "set"),
        }
    }
}

/// A backing-store failure with operation and key context.
#[derive(Debug, Error)]
#[error("storage {operation} failed for {key}: {message}")]
pub struct StorageError {
    /// The failed operation.
    pub operation: StorageOperation,
    /// The key the operation targeted.
    pub key: String,
    /// Driver-reported failure detail.
    pub message: String,
}

impl StorageError {
    /// Create a storage error.
    #[must_use]
    pub fn new(
        operation: StorageOperation,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }
}

/// Errors surfaced by the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The backing store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A message could not be serialized for storage.
    #[error("failed to encode message {id}")]
    Encode {
        /// ID of the message that failed to encode.
        id: MessageId,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A stored item could not be decoded as a message.
    #[error("failed to decode stored message")]
    Decode {
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}
