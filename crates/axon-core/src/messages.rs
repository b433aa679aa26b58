//! Message types for the Axon conversation model.
//!
//! Messages form the conversation history passed to LLM providers. Each
//! message carries a role and an ordered list of content parts; tool calls
//! and tool results are parts, so a tool-call/tool-result pair can be
//! located anywhere in history by call ID.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{MessageId, ToolCallId};

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Conversation role of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Tool execution result.
    Tool,
    /// System-injected content.
    System,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool call / tool result
// ─────────────────────────────────────────────────────────────────────────────

/// A tool call emitted by the assistant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique tool call ID.
    pub id: ToolCallId,
    /// Tool name.
    pub name: String,
    /// Tool arguments (JSON object).
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    /// Create a tool call with the given name and arguments.
    #[must_use]
    pub fn new(id: impl Into<ToolCallId>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of a tool call, bound to it by `call_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPart {
    /// ID of the tool call this result corresponds to.
    pub call_id: ToolCallId,
    /// Result payload (JSON).
    pub payload: Value,
    /// Whether the tool execution succeeded.
    pub success: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Content parts
// ─────────────────────────────────────────────────────────────────────────────

/// A referenced binary attachment (image or file).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Opaque reference (URL, blob key, or data URI).
    pub reference: String,
    /// MIME type of the referenced content.
    pub mime_type: String,
}

/// One element of a message's ordered content list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// Image reference.
    Image {
        /// Opaque reference (URL, blob key, or data URI).
        reference: String,
        /// MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// File reference.
    File {
        /// Opaque reference (URL, blob key, or data URI).
        reference: String,
        /// MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Tool call intent emitted by the assistant.
    ToolCall(ToolCall),
    /// Tool execution outcome.
    ToolResult(ToolResultPart),
    /// Model reasoning (extended thinking).
    Reasoning {
        /// Reasoning text.
        text: String,
        /// Provider verification signature.
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
}

impl ContentPart {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create an image part from an attachment.
    #[must_use]
    pub fn image(attachment: Attachment) -> Self {
        Self::Image {
            reference: attachment.reference,
            mime_type: attachment.mime_type,
        }
    }

    /// Create a file part from an attachment.
    #[must_use]
    pub fn file(attachment: Attachment) -> Self {
        Self::File {
            reference: attachment.reference,
            mime_type: attachment.mime_type,
        }
    }

    /// Create a reasoning part.
    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning {
            text: text.into(),
            signature: None,
        }
    }

    /// The text of a `Text` part, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns `true` if this is a tool call part.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Token usage
// ─────────────────────────────────────────────────────────────────────────────

/// Token usage information from an LLM response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Input tokens consumed by the call.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
    /// Tokens read from prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u64>,
    /// Tokens written to prompt cache.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_tokens: Option<u64>,
}

impl TokenUsage {
    /// Add another usage record into this one (accumulation across iterations).
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        if let Some(cache) = other.cache_read_tokens {
            *self.cache_read_tokens.get_or_insert(0) += cache;
        }
        if let Some(cache) = other.cache_creation_tokens {
            *self.cache_creation_tokens.get_or_insert(0) += cache;
        }
    }

    /// Total tokens (input + output).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// A conversation message.
///
/// The `id` is unique within a session's history and never changes after the
/// message is appended. Content is immutable after append except for
/// `token_usage`, which may be backfilled once the LLM call completes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID.
    pub id: MessageId,
    /// Conversation role.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
    /// Token usage, backfilled after the call completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}

impl Message {
    /// Create a message with a fresh ID.
    #[must_use]
    pub fn new(role: Role, content: Vec<ContentPart>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            token_usage: None,
        }
    }

    /// Create a user message from plain text.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentPart::text(text)])
    }

    /// Create an assistant message from plain text.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Create a system message from plain text.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, vec![ContentPart::text(text)])
    }

    /// Create a tool-result message bound to `call_id`.
    #[must_use]
    pub fn tool_result(call_id: ToolCallId, payload: Value, success: bool) -> Self {
        Self::new(
            Role::Tool,
            vec![ContentPart::ToolResult(ToolResultPart {
                call_id,
                payload,
                success,
            })],
        )
    }

    /// Returns `true` if this is a user message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Returns `true` if this is a system message.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Concatenated text of all `Text` parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// All tool calls carried by this message.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }

    /// All tool results carried by this message.
    #[must_use]
    pub fn tool_results(&self) -> Vec<&ToolResultPart> {
        self.content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(tr) => Some(tr),
                _ => None,
            })
            .collect()
    }

    /// The first reasoning part's text, if any.
    #[must_use]
    pub fn reasoning(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            ContentPart::Reasoning { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Returns `true` if this message carries at least one tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.content.iter().any(ContentPart::is_tool_call)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
