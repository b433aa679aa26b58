//! Engine configuration and turn outcomes.

use serde::{Deserialize, Serialize};

use axon_core::messages::TokenUsage;

/// Configuration for a [`crate::TurnEngine`].
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Model identifier handed to the formatter and provider.
    pub model: String,
    /// Maximum input tokens the model accepts (compaction budget).
    pub max_input_tokens: u64,
    /// Maximum LLM calls per turn.
    pub max_iterations: u32,
    /// Stream responses (emitting `chunk`/`thinking` events) instead of
    /// one-shot completion.
    pub streaming: bool,
    /// Timeout for approval requests, in milliseconds. `None` waits
    /// indefinitely.
    pub approval_timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_input_tokens: 128_000,
            max_iterations: 10,
            streaming: false,
            approval_timeout_ms: None,
        }
    }
}

/// How a turn ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The LLM finished without further tool work.
    Completed,
    /// The abort signal was observed. Deliberate, not a failure.
    Aborted,
    /// The iteration budget ran out; partial text is returned.
    MaxIterationsReached,
    /// The LLM call failed; the session survives.
    Error,
}

/// The result of one turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    /// Terminal status.
    pub status: TurnStatus,
    /// Accumulated assistant text (partial on abort/exhaustion).
    pub text: String,
    /// LLM calls performed.
    pub iterations: u32,
    /// Accumulated token usage across iterations.
    pub token_usage: TokenUsage,
    /// Error detail when `status` is [`TurnStatus::Error`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Non-fatal warning (iteration exhaustion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// What one iteration of the loop decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IterationOutcome {
    /// Tool calls were executed; loop again.
    Continue,
    /// No tool calls; the turn is done.
    Completed,
    /// The abort signal was observed.
    Aborted,
    /// The LLM call failed.
    Failed,
}

/// Result of one iteration.
pub(crate) struct IterationResult {
    pub outcome: IterationOutcome,
    /// Text produced this iteration.
    pub text: String,
    /// Usage reported this iteration.
    pub token_usage: Option<TokenUsage>,
    /// Error detail for [`IterationOutcome::Failed`].
    pub error: Option<String>,
}
