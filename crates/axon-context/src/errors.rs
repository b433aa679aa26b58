//! Context subsystem errors.

use axon_core::ids::ToolCallId;
use axon_history::HistoryError;
use thiserror::Error;

/// Errors surfaced by the context manager.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A tool result arrived with no matching pending tool call.
    #[error("no pending tool call {call_id} for tool {tool_name}")]
    ToolResultOrphaned {
        /// The unmatched call ID.
        call_id: ToolCallId,
        /// Tool name the result claimed.
        tool_name: String,
    },

    /// A history-store operation failed.
    #[error(transparent)]
    History(#[from] HistoryError),
}
