//! Compaction strategies for fitting history into a token budget.
//!
//! A strategy maps `(messages, estimate, budget)` to a possibly shortened
//! message list plus the estimate it now expects to consume. Two rules are
//! inviolable: the most recent user message survives, and a tool-call is
//! never separated from its tool-result (they are dropped together or not at
//! all). Strategies are pure functions of their inputs so compaction
//! decisions are testable.

use std::collections::HashSet;

use tracing::{debug, warn};

use axon_core::ids::ToolCallId;
use axon_core::messages::Message;

use crate::token_counter::TokenCounter;

/// The outcome of a compaction pass.
#[derive(Clone, Debug, PartialEq)]
pub struct CompactionDecision {
    /// Possibly shortened message list.
    pub messages: Vec<Message>,
    /// Token estimate after compaction.
    pub estimated_tokens: u64,
}

/// Decides how to shrink history when the token budget is exceeded.
pub trait CompactionStrategy: Send + Sync {
    /// Produce a (possibly) reduced message list for the given budget.
    fn compact(
        &self,
        messages: &[Message],
        estimated_tokens: u64,
        max_input_tokens: u64,
        counter: &dyn TokenCounter,
    ) -> CompactionDecision;
}

// ─────────────────────────────────────────────────────────────────────────────
// No-op strategy
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the input unchanged. Used when compaction is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCompaction;

impl CompactionStrategy for NoopCompaction {
    fn compact(
        &self,
        messages: &[Message],
        estimated_tokens: u64,
        _max_input_tokens: u64,
        _counter: &dyn TokenCounter,
    ) -> CompactionDecision {
        CompactionDecision {
            messages: messages.to_vec(),
            estimated_tokens,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reactive overflow strategy
// ─────────────────────────────────────────────────────────────────────────────

/// Truncates from the oldest non-system messages forward, only when the
/// estimate exceeds the budget.
///
/// Messages linked by tool-call IDs form a unit and are dropped together.
/// If the budget is still exceeded after maximal truncation, the decision
/// proceeds anyway with a warning — LLM calls are not pre-empted client-side
/// on a best-effort estimate.
#[derive(Clone, Copy, Debug, Default)]
pub struct OverflowCompaction;

impl CompactionStrategy for OverflowCompaction {
    fn compact(
        &self,
        messages: &[Message],
        estimated_tokens: u64,
        max_input_tokens: u64,
        counter: &dyn TokenCounter,
    ) -> CompactionDecision {
        if estimated_tokens <= max_input_tokens {
            return CompactionDecision {
                messages: messages.to_vec(),
                estimated_tokens,
            };
        }

        let last_user = messages.iter().rposition(Message::is_user);
        let protected = |index: usize| -> bool {
            messages[index].is_system() || Some(index) == last_user
        };

        let mut estimate = estimated_tokens;
        let mut dropped = vec![false; messages.len()];
        let mut visited = vec![false; messages.len()];

        for index in 0..messages.len() {
            if estimate <= max_input_tokens {
                break;
            }
            if visited[index] || protected(index) {
                continue;
            }

            let unit = linked_unit(messages, index);
            for &member in &unit {
                visited[member] = true;
            }
            // Dropping a unit that contains a protected message would orphan
            // its pair partners; keep the whole unit.
            if unit.iter().any(|&member| protected(member)) {
                continue;
            }

            for &member in &unit {
                dropped[member] = true;
                estimate = estimate
                    .saturating_sub(u64::from(counter.count_message(&messages[member])));
            }
        }

        if estimate > max_input_tokens {
            warn!(
                estimate,
                budget = max_input_tokens,
                "history still exceeds budget after maximal compaction; proceeding"
            );
        }

        let kept: Vec<Message> = messages
            .iter()
            .enumerate()
            .filter(|(index, _)| !dropped[*index])
            .map(|(_, message)| message.clone())
            .collect();
        debug!(
            before = messages.len(),
            after = kept.len(),
            "overflow compaction applied"
        );

        CompactionDecision {
            messages: kept,
            estimated_tokens: estimate,
        }
    }
}

/// All message indices linked to `seed` through shared tool-call IDs.
///
/// Fixed point over the call-ID relation: a tool-call message pulls in its
/// result messages, a result message pulls in its call message and, through
/// it, sibling results.
fn linked_unit(messages: &[Message], seed: usize) -> Vec<usize> {
    let mut members = vec![seed];
    let mut ids: HashSet<ToolCallId> = call_ids(&messages[seed]);
    if ids.is_empty() {
        return members;
    }

    loop {
        let mut changed = false;
        for (index, message) in messages.iter().enumerate() {
            if members.contains(&index) {
                continue;
            }
            let message_ids = call_ids(message);
            if message_ids.iter().any(|id| ids.contains(id)) {
                members.push(index);
                ids.extend(message_ids);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    members.sort_unstable();
    members
}

/// Call IDs referenced by a message, from both tool-call and tool-result parts.
fn call_ids(message: &Message) -> HashSet<ToolCallId> {
    let mut ids: HashSet<ToolCallId> = message
        .tool_calls()
        .into_iter()
        .map(|tc| tc.id.clone())
        .collect();
    ids.extend(message.tool_results().into_iter().map(|tr| tr.call_id.clone()));
    ids
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
