//! In-memory working set with token caching.
//!
//! [`MessageStore`] holds the conversation messages for an active session and
//! maintains a parallel token-count cache so that budget calculations avoid
//! redundant re-estimation. Add/set/clear keep both vectors in sync;
//! index-based lookup is O(1).

use std::sync::Arc;

use axon_core::ids::MessageId;
use axon_core::messages::{Message, TokenUsage};

use crate::token_counter::TokenCounter;

/// Working-set message store with per-message token caching.
pub struct MessageStore {
    messages: Vec<Message>,
    token_cache: Vec<u32>,
    counter: Arc<dyn TokenCounter>,
}

impl MessageStore {
    /// Create an empty store using the given counter for estimates.
    #[must_use]
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            messages: Vec::new(),
            token_cache: Vec::new(),
            counter,
        }
    }

    /// Add a message; its token estimate is computed and cached immediately.
    pub fn add(&mut self, message: Message) {
        let tokens = self.counter.count_message(&message);
        self.messages.push(message);
        self.token_cache.push(tokens);
    }

    /// Replace all messages; the token cache is rebuilt.
    pub fn set(&mut self, messages: Vec<Message>) {
        self.token_cache = messages
            .iter()
            .map(|m| self.counter.count_message(m))
            .collect();
        self.messages = messages;
    }

    /// Get a clone of all messages.
    #[must_use]
    pub fn get(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Get a reference to the internal message slice (no allocation).
    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// Clear all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.token_cache.clear();
    }

    /// Total estimated tokens across all messages (cached, no re-estimation).
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.token_cache.iter().map(|&t| u64::from(t)).sum()
    }

    /// Cached token count for the message at `index`.
    #[must_use]
    pub fn cached_tokens(&self, index: usize) -> Option<u32> {
        self.token_cache.get(index).copied()
    }

    /// Backfill token usage on a message in place.
    ///
    /// Returns a clone of the updated message, or `None` if the id is
    /// unknown. Content is untouched, so the cached estimate stays valid.
    pub fn set_usage(&mut self, id: &MessageId, usage: TokenUsage) -> Option<Message> {
        let pos = self.messages.iter().position(|m| &m.id == id)?;
        self.messages[pos].token_usage = Some(usage);
        Some(self.messages[pos].clone())
    }

    /// Current message count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if the store contains no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
