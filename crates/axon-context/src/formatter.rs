//! Message formatter contract.
//!
//! A formatter maps the canonical message list to a provider wire shape.
//! One implementation exists per provider family, selected by configuration
//! at construction time — the core never type-switches on providers.
//! [`JsonFormatter`] is the provider-neutral reference implementation.

use serde_json::{json, Value};

use axon_core::messages::Message;

use crate::types::LlmContext;

/// Maps canonical messages to a provider payload.
pub trait MessageFormatter: Send + Sync {
    /// Produce the provider payload for a call.
    fn format(&self, messages: &[Message], provider: &LlmContext, system_prompt: &str) -> Value;

    /// Provider-specific system prompt shape. Defaults to a plain string.
    fn format_system_prompt(&self, system_prompt: &str) -> Value {
        Value::String(system_prompt.to_owned())
    }
}

/// Provider-neutral formatter: canonical messages as JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter;

impl MessageFormatter for JsonFormatter {
    fn format(&self, messages: &[Message], provider: &LlmContext, system_prompt: &str) -> Value {
        // Message serialization is infallible: all keys are strings.
        let messages = serde_json::to_value(messages).unwrap_or_else(|_| json!([]));
        json!({
            "model": provider.model,
            "system": self.format_system_prompt(system_prompt),
            "messages": messages,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
