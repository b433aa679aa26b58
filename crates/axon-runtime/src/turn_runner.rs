//! One iteration of the turn loop: context → LLM call → tool fan-out.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use axon_approval::ApprovalCoordinator;
use axon_context::{AssistantMeta, ContextManager, ContributorContext, LlmContext};
use axon_core::events::{AgentEvent, BaseEvent, EventSink};
use axon_core::ids::SessionId;
use axon_core::messages::TokenUsage;

use crate::capabilities::{LlmChunk, LlmClient, LlmError, LlmRequest, LlmResponse, ToolExecutor};
use crate::errors::EngineError;
use crate::tool_dispatch::{self, Dispatch};
use crate::types::{EngineConfig, IterationOutcome, IterationResult};

/// Run one iteration: produce the provider payload, call the LLM, append
/// the assistant message, and dispatch any tool calls.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(session_id = %session_id, iteration))]
pub(crate) async fn run_iteration(
    iteration: u32,
    config: &EngineConfig,
    session_id: &SessionId,
    context: &mut ContextManager,
    llm: &Arc<dyn LlmClient>,
    tools: &Arc<dyn ToolExecutor>,
    approvals: &Arc<ApprovalCoordinator>,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Result<IterationResult, EngineError> {
    // 1. Provider payload (system prompt + compaction + formatting).
    let formatted = context.formatted_messages_with_compression(
        &ContributorContext::new(session_id.clone()),
        &LlmContext {
            model: config.model.clone(),
            max_input_tokens: config.max_input_tokens,
        },
    );
    debug!(tokens = formatted.tokens_used, "payload assembled");

    let request = LlmRequest {
        formatted_messages: formatted.formatted_messages,
        system_prompt: formatted.system_prompt,
        tools: tools.definitions(),
    };

    // 2. LLM call (streaming or one-shot), racing the abort signal.
    let response = match call_llm(config, llm, &request, session_id, sink, cancel).await {
        Ok(response) => response,
        Err(LlmError::Aborted) => {
            return Ok(IterationResult {
                outcome: IterationOutcome::Aborted,
                text: String::new(),
                token_usage: None,
                error: None,
            });
        }
        Err(err) => {
            error!(error = %err, "LLM call failed");
            sink.emit(AgentEvent::Error {
                base: BaseEvent::now(session_id.as_str()),
                message: err.to_string(),
            });
            return Ok(IterationResult {
                outcome: IterationOutcome::Failed,
                text: String::new(),
                token_usage: None,
                error: Some(err.to_string()),
            });
        }
    };

    // A cancellation observed during the call: the half-finished assistant
    // message is not appended.
    if cancel.is_cancelled() {
        return Ok(IterationResult {
            outcome: IterationOutcome::Aborted,
            text: String::new(),
            token_usage: None,
            error: None,
        });
    }

    // 3. Append the assistant message, then backfill usage in place.
    let assistant_id = context
        .add_assistant_message(
            &response.text,
            response.tool_calls.clone(),
            AssistantMeta {
                token_usage: None,
                reasoning: response.reasoning.clone(),
            },
        )
        .await?;

    if let Some(usage) = &response.usage {
        context.backfill_usage(&assistant_id, usage.clone());
        // The provider-reported count is ground truth for the next call.
        context.update_actual_token_count(usage.input_tokens + usage.output_tokens);
    }

    sink.emit(AgentEvent::Response {
        base: BaseEvent::now(session_id.as_str()),
        text: response.text.clone(),
        token_usage: response.usage.clone(),
    });

    // 4. No tool calls: the turn is complete.
    if response.tool_calls.is_empty() {
        return Ok(IterationResult {
            outcome: IterationOutcome::Completed,
            text: response.text,
            token_usage: response.usage,
            error: None,
        });
    }

    // 5. Dispatch tool calls sequentially.
    for tool_call in &response.tool_calls {
        let dispatched = tool_dispatch::dispatch(
            tool_call, config, session_id, context, tools, approvals, sink, cancel,
        )
        .await?;
        if dispatched == Dispatch::Aborted {
            return Ok(IterationResult {
                outcome: IterationOutcome::Aborted,
                text: response.text,
                token_usage: response.usage,
                error: None,
            });
        }
    }

    Ok(IterationResult {
        outcome: IterationOutcome::Continue,
        text: response.text,
        token_usage: response.usage,
        error: None,
    })
}

/// Call the LLM, emitting `chunk`/`thinking` events in streaming mode.
async fn call_llm(
    config: &EngineConfig,
    llm: &Arc<dyn LlmClient>,
    request: &LlmRequest,
    session_id: &SessionId,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Result<LlmResponse, LlmError> {
    if !config.streaming {
        return tokio::select! {
            () = cancel.cancelled() => Err(LlmError::Aborted),
            result = llm.complete(request, cancel) => result,
        };
    }

    let mut stream = llm.stream(request, cancel).await?;
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();
    let mut done: Option<LlmResponse> = None;

    loop {
        let item = tokio::select! {
            () = cancel.cancelled() => return Err(LlmError::Aborted),
            item = stream.next() => item,
        };
        let Some(item) = item else { break };
        match item? {
            LlmChunk::TextDelta { delta } => {
                sink.emit(AgentEvent::Chunk {
                    base: BaseEvent::now(session_id.as_str()),
                    delta: delta.clone(),
                });
                text.push_str(&delta);
            }
            LlmChunk::ReasoningDelta { delta } => {
                sink.emit(AgentEvent::Thinking {
                    base: BaseEvent::now(session_id.as_str()),
                    delta: delta.clone(),
                });
                reasoning.push_str(&delta);
            }
            LlmChunk::ToolCall { tool_call } => tool_calls.push(tool_call),
            LlmChunk::Done { response } => done = Some(response),
        }
    }

    Ok(done.unwrap_or(LlmResponse {
        text,
        reasoning: if reasoning.is_empty() {
            None
        } else {
            Some(reasoning)
        },
        tool_calls,
        usage: None,
    }))
}

/// Accumulate a `TokenUsage` option into a running total.
pub(crate) fn accumulate_usage(total: &mut TokenUsage, usage: Option<&TokenUsage>) {
    if let Some(usage) = usage {
        total.accumulate(usage);
    }
}
