//! Token estimation.
//!
//! The tokenizer itself is external — the engine only needs an estimate, so
//! counting is injected via [`TokenCounter`]. [`HeuristicCounter`] is the
//! default: chars/4 for text, flat constants for binary references.

use serde_json::Value;

use axon_core::messages::{ContentPart, Message};

use crate::constants::{
    CHARS_PER_TOKEN, FILE_PART_TOKENS, IMAGE_PART_TOKENS, MESSAGE_OVERHEAD_TOKENS,
};

/// Injected token estimation.
pub trait TokenCounter: Send + Sync {
    /// Estimate tokens for a span of text.
    fn count_text(&self, text: &str) -> u32;

    /// Estimate tokens for a single content part.
    fn count_part(&self, part: &ContentPart) -> u32 {
        match part {
            ContentPart::Text { text } | ContentPart::Reasoning { text, .. } => {
                self.count_text(text)
            }
            ContentPart::Image { .. } => IMAGE_PART_TOKENS,
            ContentPart::File { .. } => FILE_PART_TOKENS,
            ContentPart::ToolCall(tc) => {
                self.count_text(tc.id.as_str())
                    + self.count_text(&tc.name)
                    + self.count_text(&Value::Object(tc.arguments.clone()).to_string())
            }
            ContentPart::ToolResult(tr) => {
                self.count_text(tr.call_id.as_str()) + self.count_text(&tr.payload.to_string())
            }
        }
    }

    /// Estimate tokens for a whole message (parts + framing overhead).
    fn count_message(&self, message: &Message) -> u32 {
        MESSAGE_OVERHEAD_TOKENS
            + message
                .content
                .iter()
                .map(|part| self.count_part(part))
                .sum::<u32>()
    }
}

/// Chars/4 approximation.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    #[allow(clippy::cast_possible_truncation)]
    fn count_text(&self, text: &str) -> u32 {
        text.len().div_ceil(CHARS_PER_TOKEN as usize) as u32
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
