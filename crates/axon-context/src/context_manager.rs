//! Central context manager.
//!
//! [`ContextManager`] owns the in-memory working set of a session's
//! messages, keeps it consistent with the durable history store, assembles
//! the system prompt, tracks tokens with a hybrid estimate/actual strategy,
//! and produces a provider-ready payload that fits the configured budget.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use axon_core::ids::{MessageId, SessionId, ToolCallId};
use axon_core::messages::{Attachment, ContentPart, Message, Role, TokenUsage, ToolCall};
use axon_history::{HistoryError, HistoryStore};

use crate::compaction::CompactionStrategy;
use crate::constants::SANITIZED_RESULT_MAX_CHARS;
use crate::errors::ContextError;
use crate::formatter::MessageFormatter;
use crate::message_store::MessageStore;
use crate::system_prompt::{assemble_system_prompt, SystemPromptContributor};
use crate::token_counter::TokenCounter;
use crate::types::{
    AssistantMeta, ContributorContext, FormattedContext, LlmContext, SanitizedToolResult,
};

/// Canonical (provider-agnostic) message history plus the machinery to turn
/// it into a budget-fitting provider payload.
pub struct ContextManager {
    session_id: SessionId,
    history: HistoryStore,
    store: MessageStore,
    counter: Arc<dyn TokenCounter>,
    formatter: Arc<dyn MessageFormatter>,
    compaction: Arc<dyn CompactionStrategy>,
    contributors: Vec<Box<dyn SystemPromptContributor>>,
    /// Provider-reported token count for this turn (trusted over estimates).
    actual_tokens: Option<u64>,
}

impl ContextManager {
    /// Create a manager for `session_id` over the given history store.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        history: HistoryStore,
        counter: Arc<dyn TokenCounter>,
        formatter: Arc<dyn MessageFormatter>,
        compaction: Arc<dyn CompactionStrategy>,
    ) -> Self {
        let store = MessageStore::new(Arc::clone(&counter));
        Self {
            session_id,
            history,
            store,
            counter,
            formatter,
            compaction,
            contributors: Vec::new(),
            actual_tokens: None,
        }
    }

    /// The session this manager belongs to.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Register a system-prompt contributor. Order of registration is
    /// assembly order.
    pub fn add_contributor(&mut self, contributor: Box<dyn SystemPromptContributor>) {
        self.contributors.push(contributor);
    }

    /// Populate the working set from durable history (session resume).
    pub async fn hydrate(&mut self) -> Result<(), HistoryError> {
        let messages = self.history.get_history().await?;
        debug!(session_id = %self.session_id, count = messages.len(), "context hydrated");
        self.store.set(messages);
        self.actual_tokens = None;
        Ok(())
    }

    // ── Message management ──────────────────────────────────────────────

    /// Append a user message and persist it immediately.
    ///
    /// Durability is user-visible: the message is in the backing store when
    /// this returns, and storage failures propagate.
    pub async fn add_user_message(
        &mut self,
        text: &str,
        image: Option<Attachment>,
        file: Option<Attachment>,
    ) -> Result<MessageId, ContextError> {
        let mut parts = vec![ContentPart::text(text)];
        if let Some(attachment) = image {
            parts.push(ContentPart::image(attachment));
        }
        if let Some(attachment) = file {
            parts.push(ContentPart::file(attachment));
        }
        self.append(Message::new(Role::User, parts)).await
    }

    /// Append an assistant message, optionally carrying reasoning and
    /// token-usage metadata.
    pub async fn add_assistant_message(
        &mut self,
        text: &str,
        tool_calls: Vec<ToolCall>,
        meta: AssistantMeta,
    ) -> Result<MessageId, ContextError> {
        let mut parts = Vec::new();
        if let Some(reasoning) = meta.reasoning {
            parts.push(ContentPart::reasoning(reasoning));
        }
        if !text.is_empty() {
            parts.push(ContentPart::text(text));
        }
        for tool_call in tool_calls {
            parts.push(ContentPart::ToolCall(tool_call));
        }

        let mut message = Message::new(Role::Assistant, parts);
        message.token_usage = meta.token_usage;
        self.append(message).await
    }

    /// Append a tool-result message bound to `call_id`.
    ///
    /// Fails with [`ContextError::ToolResultOrphaned`] when no pending tool
    /// call with that ID exists in the working set (a pending call is one
    /// with no result yet). Returns a sanitized, display-safe rendering of
    /// the result for event emission.
    pub async fn add_tool_result(
        &mut self,
        call_id: &ToolCallId,
        tool_name: &str,
        payload: Value,
        success: bool,
    ) -> Result<SanitizedToolResult, ContextError> {
        let has_call = self
            .store
            .as_slice()
            .iter()
            .flat_map(Message::tool_calls)
            .any(|tc| &tc.id == call_id);
        let has_result = self
            .store
            .as_slice()
            .iter()
            .flat_map(Message::tool_results)
            .any(|tr| &tr.call_id == call_id);
        if !has_call || has_result {
            return Err(ContextError::ToolResultOrphaned {
                call_id: call_id.clone(),
                tool_name: tool_name.to_owned(),
            });
        }

        let sanitized = sanitize_payload(call_id, tool_name, &payload, success);
        let message = Message::tool_result(call_id.clone(), payload, success);
        let _ = self.append(message).await?;
        Ok(sanitized)
    }

    async fn append(&mut self, message: Message) -> Result<MessageId, ContextError> {
        let id = message.id.clone();
        self.history.save_message(message.clone()).await?;
        self.store.add(message);
        Ok(id)
    }

    /// Backfill token usage on an appended message.
    ///
    /// The working-set copy is updated in place; the durable copy follows
    /// within one debounce window (or on the next flush).
    pub fn backfill_usage(&mut self, id: &MessageId, usage: TokenUsage) {
        if let Some(updated) = self.store.set_usage(id, usage) {
            self.history.update_message(updated);
        }
    }

    /// Get a defensive copy of the working set.
    #[must_use]
    pub fn get_messages(&self) -> Vec<Message> {
        self.store.get()
    }

    /// Number of messages in the working set.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.store.len()
    }

    // ── Token accounting ────────────────────────────────────────────────

    /// Reconcile with the token count reported by a completed LLM call.
    ///
    /// Actual counts are trusted over estimates for the rest of the turn;
    /// they are cleared whenever the message set changes shape.
    pub fn update_actual_token_count(&mut self, tokens: u64) {
        self.actual_tokens = Some(tokens);
    }

    /// Estimated tokens in the working set (messages only).
    #[must_use]
    pub fn message_tokens(&self) -> u64 {
        self.store.total_tokens()
    }

    // ── Payload assembly ────────────────────────────────────────────────

    /// Assemble the system prompt, apply compaction when over budget, and
    /// format the provider payload.
    ///
    /// Deterministic for a given history and budget: the token estimate is
    /// either the provider-reported actual or the sum of cached estimates,
    /// and compaction strategies are pure functions.
    pub fn formatted_messages_with_compression(
        &mut self,
        contributor_ctx: &ContributorContext,
        llm_ctx: &LlmContext,
    ) -> FormattedContext {
        let system_prompt = assemble_system_prompt(&self.contributors, contributor_ctx);

        let mut estimate = self.actual_tokens.unwrap_or_else(|| {
            u64::from(self.counter.count_text(&system_prompt)) + self.store.total_tokens()
        });

        if estimate > llm_ctx.max_input_tokens {
            let decision = self.compaction.compact(
                self.store.as_slice(),
                estimate,
                llm_ctx.max_input_tokens,
                self.counter.as_ref(),
            );
            if decision.messages.len() != self.store.len() {
                debug!(
                    session_id = %self.session_id,
                    before = self.store.len(),
                    after = decision.messages.len(),
                    "compaction reduced working set"
                );
                self.store.set(decision.messages);
                // The estimate basis changed; stale actuals no longer apply.
                self.actual_tokens = None;
            }
            estimate = decision.estimated_tokens;
        }

        let formatted_messages =
            self.formatter
                .format(self.store.as_slice(), llm_ctx, &system_prompt);

        FormattedContext {
            formatted_messages,
            system_prompt,
            tokens_used: estimate,
        }
    }

    // ── Turn boundaries ─────────────────────────────────────────────────

    /// Force pending history writes to durable storage.
    pub async fn flush(&self) -> Result<(), HistoryError> {
        self.history.flush().await
    }

    /// Clear the working set and the durable history.
    pub async fn clear(&mut self) -> Result<(), HistoryError> {
        self.history.clear_history().await?;
        self.store.clear();
        self.actual_tokens = None;
        Ok(())
    }
}

/// Render a payload for display, truncating oversized content.
fn sanitize_payload(
    call_id: &ToolCallId,
    tool_name: &str,
    payload: &Value,
    success: bool,
) -> SanitizedToolResult {
    let rendered = match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    let (content, truncated) = if rendered.len() <= SANITIZED_RESULT_MAX_CHARS {
        (rendered, false)
    } else {
        let mut end = SANITIZED_RESULT_MAX_CHARS;
        while !rendered.is_char_boundary(end) {
            end -= 1;
        }
        (
            format!(
                "{}...\n[Truncated: {} chars total, showing first {end}]",
                &rendered[..end],
                rendered.len(),
            ),
            true,
        )
    };

    SanitizedToolResult {
        call_id: call_id.clone(),
        tool_name: tool_name.to_owned(),
        content,
        truncated,
        success,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
