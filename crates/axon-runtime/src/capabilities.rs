//! Injected capability contracts.
//!
//! The engine never talks to a provider or runs a tool directly. An
//! [`LlmClient`] and a [`ToolExecutor`] are injected at construction —
//! one implementation per provider family / tool transport, selected by
//! configuration. Errors from either are captured at the engine boundary,
//! never propagated as panics.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use axon_core::ids::SessionId;
use axon_core::messages::{TokenUsage, ToolCall};
use axon_core::tools::ToolDefinition;

// ─────────────────────────────────────────────────────────────────────────────
// LLM call capability
// ─────────────────────────────────────────────────────────────────────────────

/// One formatted request to the LLM.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    /// Provider payload from the message formatter.
    pub formatted_messages: Value,
    /// Assembled system prompt.
    pub system_prompt: String,
    /// Tools available this call.
    pub tools: Vec<ToolDefinition>,
}

/// A complete LLM response, split into text and tool-call intents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LlmResponse {
    /// Response text.
    pub text: String,
    /// Reasoning (extended thinking), when the provider surfaces it.
    pub reasoning: Option<String>,
    /// Tool-call intents, in provider order.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage reported with the response.
    pub usage: Option<TokenUsage>,
}

/// One increment of a streamed LLM response.
#[derive(Clone, Debug, PartialEq)]
pub enum LlmChunk {
    /// Incremental response text.
    TextDelta {
        /// Text fragment.
        delta: String,
    },
    /// Incremental reasoning text.
    ReasoningDelta {
        /// Reasoning fragment.
        delta: String,
    },
    /// A fully constructed tool call.
    ToolCall {
        /// The tool call.
        tool_call: ToolCall,
    },
    /// Stream end, carrying the authoritative assembled response.
    Done {
        /// The complete response.
        response: LlmResponse,
    },
}

/// Stream of response increments.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<LlmChunk, LlmError>> + Send>>;

/// LLM call failure.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider call failed.
    #[error("provider call failed: {message}")]
    Provider {
        /// Provider-reported detail.
        message: String,
        /// Whether a retry could succeed.
        retryable: bool,
    },

    /// The call observed the abort signal.
    #[error("LLM call aborted")]
    Aborted,
}

/// Injected LLM call capability.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Perform one call and return the complete response.
    async fn complete(
        &self,
        request: &LlmRequest,
        signal: &CancellationToken,
    ) -> Result<LlmResponse, LlmError>;

    /// Streaming variant. The default emits the complete response as a
    /// single text chunk followed by `Done`.
    async fn stream(
        &self,
        request: &LlmRequest,
        signal: &CancellationToken,
    ) -> Result<ChunkStream, LlmError> {
        let response = self.complete(request, signal).await?;
        let chunks = vec![
            Ok(LlmChunk::TextDelta {
                delta: response.text.clone(),
            }),
            Ok(LlmChunk::Done { response }),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool execution capability
// ─────────────────────────────────────────────────────────────────────────────

/// Tool execution failure; captured as a failed tool-result, never propagated.
#[derive(Debug, Error)]
#[error("tool {tool_name} failed: {message}")]
pub struct ToolError {
    /// The failing tool.
    pub tool_name: String,
    /// Failure detail.
    pub message: String,
}

impl ToolError {
    /// Create a tool error.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }
}

/// Injected tool execution capability.
///
/// Approval *policy* lives behind [`ToolExecutor::requires_approval`]; the
/// engine only enforces the gate.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions of the tools available to the LLM.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Whether `tool_name` needs an approval decision before execution.
    fn requires_approval(&self, tool_name: &str) -> bool;

    /// Execute a tool call.
    async fn execute(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
        session_id: &SessionId,
    ) -> Result<Value, ToolError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
