//! # axon-context
//!
//! Context assembly, token accounting, compaction, and message formatting.
//!
//! - **Context manager**: owns the in-memory working set of a session's
//!   messages, persists through the history store, and produces a
//!   provider-ready payload that fits a token budget
//! - **Message store**: working set with a parallel per-message token cache
//! - **Compaction**: pluggable strategies — no-op and reactive overflow
//! - **Token counting**: injected `TokenCounter` with a chars/4 heuristic default
//! - **System prompts**: pluggable contributors assembled in registration order
//! - **Formatter**: provider-agnostic `MessageFormatter` contract with a JSON
//!   reference implementation

#![deny(unsafe_code)]

pub mod compaction;
pub mod constants;
pub mod context_manager;
pub mod errors;
pub mod formatter;
pub mod message_store;
pub mod system_prompt;
pub mod token_counter;
pub mod types;

pub use compaction::{CompactionDecision, CompactionStrategy, NoopCompaction, OverflowCompaction};
pub use context_manager::ContextManager;
pub use errors::ContextError;
pub use formatter::{JsonFormatter, MessageFormatter};
pub use message_store::MessageStore;
pub use system_prompt::{StaticContributor, SystemPromptContributor};
pub use token_counter::{HeuristicCounter, TokenCounter};
pub use types::{
    AssistantMeta, ContributorContext, FormattedContext, LlmContext, SanitizedToolResult,
};
