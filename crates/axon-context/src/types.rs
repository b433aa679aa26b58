//! Shared types for the context subsystem.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use axon_core::ids::{SessionId, ToolCallId};
use axon_core::messages::TokenUsage;

/// Provider/model-specific inputs for one LLM call.
///
/// Supplied externally per call — the context manager does not hardcode
/// model limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmContext {
    /// Model identifier.
    pub model: String,
    /// Maximum input tokens the model accepts.
    pub max_input_tokens: u64,
}

/// Context handed to system-prompt contributors.
#[derive(Clone, Debug, Default)]
pub struct ContributorContext {
    /// Session the prompt is being assembled for.
    pub session_id: SessionId,
    /// Free-form metadata (working directory, mode flags).
    pub metadata: Map<String, Value>,
}

impl ContributorContext {
    /// Create a contributor context for a session.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            metadata: Map::new(),
        }
    }
}

/// Provider-ready payload produced by
/// [`crate::ContextManager::formatted_messages_with_compression`].
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedContext {
    /// Provider payload from the message formatter.
    pub formatted_messages: Value,
    /// Assembled system prompt.
    pub system_prompt: String,
    /// Token estimate for the payload (actual count when reconciled).
    pub tokens_used: u64,
}

/// Display-safe rendering of a tool result, for event emission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedToolResult {
    /// Tool call this result belongs to.
    pub call_id: ToolCallId,
    /// Tool name.
    pub tool_name: String,
    /// Rendered (possibly truncated) result text.
    pub content: String,
    /// Whether the content was truncated for display.
    pub truncated: bool,
    /// Whether the tool execution succeeded.
    pub success: bool,
}

/// Optional metadata attached to an assistant message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantMeta {
    /// Token usage reported with the response.
    pub token_usage: Option<TokenUsage>,
    /// Reasoning (extended thinking) text.
    pub reasoning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_context_serde() {
        let ctx = LlmContext {
            model: "sable-large".into(),
            max_input_tokens: 200_000,
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["maxInputTokens"], 200_000);
    }

    #[test]
    fn contributor_context_defaults_empty_metadata() {
        let ctx = ContributorContext::new("s1".into());
        assert!(ctx.metadata.is_empty());
    }

    #[test]
    fn assistant_meta_default_is_empty() {
        let meta = AssistantMeta::default();
        assert!(meta.token_usage.is_none());
        assert!(meta.reasoning.is_none());
    }
}
