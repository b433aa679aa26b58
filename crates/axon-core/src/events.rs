//! Agent lifecycle events and the fire-and-forget event sink.
//!
//! The engine reports progress (streamed text, tool activity, approvals,
//! errors) by writing [`AgentEvent`]s to an [`EventSink`]. Transport layers
//! (SSE, CLI, sockets) subscribe independently; the core never depends on
//! delivery succeeding.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::ids::ToolCallId;
use crate::messages::TokenUsage;

/// Default broadcast channel capacity for an [`EventSink`].
const DEFAULT_SINK_CAPACITY: usize = 256;

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Common fields for all agent events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Session this event belongs to.
    pub session_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Create a new base event with the current UTC timestamp.
    #[must_use]
    pub fn now(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Notifications emitted by the engine during a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// Incremental reasoning text.
    #[serde(rename = "thinking")]
    Thinking {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Reasoning text fragment.
        delta: String,
    },

    /// Incremental response text.
    #[serde(rename = "chunk")]
    Chunk {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Text fragment.
        delta: String,
    },

    /// A tool call is about to be handled.
    #[serde(rename = "toolCall")]
    ToolCall {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Tool call ID.
        #[serde(rename = "toolCallId")]
        tool_call_id: ToolCallId,
        /// Tool name.
        name: String,
        /// Tool arguments.
        arguments: Map<String, Value>,
    },

    /// A tool call finished (display-safe content).
    #[serde(rename = "toolResult")]
    ToolResult {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Tool call ID.
        #[serde(rename = "toolCallId")]
        tool_call_id: ToolCallId,
        /// Tool name.
        name: String,
        /// Sanitized result content.
        content: String,
        /// Whether the tool execution succeeded.
        success: bool,
    },

    /// An LLM call completed.
    #[serde(rename = "response")]
    Response {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Full response text.
        text: String,
        /// Token usage, when the provider reported it.
        #[serde(rename = "tokenUsage", skip_serializing_if = "Option::is_none")]
        token_usage: Option<TokenUsage>,
    },

    /// A turn-level error.
    #[serde(rename = "error")]
    Error {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Error message.
        message: String,
    },

    /// An approval decision is needed.
    #[serde(rename = "approval:request")]
    ApprovalRequested {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// The pending request.
        request: ApprovalRequest,
    },

    /// An approval request resolved (including synthetic timeout responses).
    #[serde(rename = "approval:response")]
    ApprovalResolved {
        /// Common fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// The resolution.
        response: ApprovalResponse,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// EventSink
// ─────────────────────────────────────────────────────────────────────────────

/// Fire-and-forget event fan-out.
///
/// Wraps a broadcast channel: `emit` never blocks and never fails from the
/// emitter's point of view — events sent with no subscribers are dropped.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: broadcast::Sender<AgentEvent>,
}

impl EventSink {
    /// Create a sink with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SINK_CAPACITY)
    }

    /// Create a sink with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event. Delivery failures (no subscribers) are ignored.
    pub fn emit(&self, event: AgentEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    /// Number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
