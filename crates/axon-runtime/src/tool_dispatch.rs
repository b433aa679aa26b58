//! Per-tool-call handling: approval gate → execute → record result.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use axon_approval::ApprovalCoordinator;
use axon_context::ContextManager;
use axon_core::approval::{ApprovalKind, ApprovalReason, ApprovalRequest, ApprovalResponse, ApprovalStatus};
use axon_core::events::{AgentEvent, BaseEvent, EventSink};
use axon_core::ids::SessionId;
use axon_core::messages::ToolCall;

use crate::capabilities::ToolExecutor;
use crate::errors::EngineError;
use crate::types::EngineConfig;

/// Whether the turn may continue after this tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// A result (success, failure, or denial) was recorded; keep going.
    Handled,
    /// The abort signal was observed; stop issuing work.
    Aborted,
}

/// Handle a single tool call: gate it when required, execute it, and append
/// the tool-result message.
///
/// A failing execution becomes a failed tool-result and the loop continues;
/// only storage failures propagate.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(tool_name = %tool_call.name, session_id = %session_id))]
pub(crate) async fn dispatch(
    tool_call: &ToolCall,
    config: &EngineConfig,
    session_id: &SessionId,
    context: &mut ContextManager,
    tools: &Arc<dyn ToolExecutor>,
    approvals: &Arc<ApprovalCoordinator>,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Result<Dispatch, EngineError> {
    if cancel.is_cancelled() {
        return Ok(Dispatch::Aborted);
    }

    sink.emit(AgentEvent::ToolCall {
        base: BaseEvent::now(session_id.as_str()),
        tool_call_id: tool_call.id.clone(),
        name: tool_call.name.clone(),
        arguments: tool_call.arguments.clone(),
    });

    // Approval gate.
    if tools.requires_approval(&tool_call.name) {
        let decision = tokio::select! {
            () = cancel.cancelled() => return Ok(Dispatch::Aborted),
            decision = request_approval(tool_call, config, session_id, approvals) => decision,
        };

        match decision.status {
            ApprovalStatus::Approved => {
                debug!(approval_id = %decision.approval_id, "tool call approved");
            }
            ApprovalStatus::Denied => {
                record_refusal(tool_call, context, sink, session_id, "denied by user").await?;
                return Ok(Dispatch::Handled);
            }
            ApprovalStatus::Cancelled => {
                if cancel.is_cancelled() {
                    return Ok(Dispatch::Aborted);
                }
                let label = match decision.reason {
                    Some(ApprovalReason::Timeout) => "approval timed out",
                    _ => "approval cancelled",
                };
                record_refusal(tool_call, context, sink, session_id, label).await?;
                return Ok(Dispatch::Handled);
            }
        }
    }

    // Execute, racing the abort signal.
    let execution = tokio::select! {
        () = cancel.cancelled() => return Ok(Dispatch::Aborted),
        result = tools.execute(&tool_call.name, &tool_call.arguments, session_id) => result,
    };

    let (payload, success) = match execution {
        Ok(value) => (value, true),
        Err(err) => {
            warn!(error = %err, "tool execution failed");
            (json!({ "error": err.to_string() }), false)
        }
    };

    let sanitized = context
        .add_tool_result(&tool_call.id, &tool_call.name, payload, success)
        .await?;
    sink.emit(AgentEvent::ToolResult {
        base: BaseEvent::now(session_id.as_str()),
        tool_call_id: tool_call.id.clone(),
        name: tool_call.name.clone(),
        content: sanitized.content,
        success,
    });

    Ok(Dispatch::Handled)
}

async fn request_approval(
    tool_call: &ToolCall,
    config: &EngineConfig,
    session_id: &SessionId,
    approvals: &Arc<ApprovalCoordinator>,
) -> ApprovalResponse {
    let mut metadata = Map::new();
    let _ = metadata.insert("toolName".into(), json!(tool_call.name));
    let _ = metadata.insert("toolCallId".into(), json!(tool_call.id.as_str()));
    let _ = metadata.insert("arguments".into(), Value::Object(tool_call.arguments.clone()));

    let mut request =
        ApprovalRequest::new(ApprovalKind::ToolConfirmation, session_id.clone(), metadata);
    request.timeout_ms = config.approval_timeout_ms;
    approvals.request(request).await
}

/// Record a gated-and-refused call as a failed tool-result so the LLM sees
/// the refusal and can adapt.
async fn record_refusal(
    tool_call: &ToolCall,
    context: &mut ContextManager,
    sink: &EventSink,
    session_id: &SessionId,
    label: &str,
) -> Result<(), EngineError> {
    let payload = json!({ "error": format!("Tool call was not executed: {label}") });
    let sanitized = context
        .add_tool_result(&tool_call.id, &tool_call.name, payload, false)
        .await?;
    sink.emit(AgentEvent::ToolResult {
        base: BaseEvent::now(session_id.as_str()),
        tool_call_id: tool_call.id.clone(),
        name: tool_call.name.clone(),
        content: sanitized.content,
        success: false,
    });
    Ok(())
}
