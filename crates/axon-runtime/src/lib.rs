//! # axon-runtime
//!
//! Agent turn loop: LLM calls, tool dispatch, approval gating.
//!
//! - **Turn engine**: drives one user-driven turn — call the LLM, interpret
//!   tool-call intents, gate risky calls behind approval, execute tools,
//!   append results, loop until completion, abort, or the iteration limit
//! - **Turn runner**: one iteration — context assembly, LLM call, tool fan-out
//! - **Tool dispatch**: approval gate, execution, result recording per call
//! - **Capabilities**: injected `LlmClient` and `ToolExecutor` contracts

#![deny(unsafe_code)]

pub mod capabilities;
pub mod errors;
mod tool_dispatch;
pub mod turn_engine;
mod turn_runner;
pub mod types;

pub use capabilities::{
    ChunkStream, LlmChunk, LlmClient, LlmError, LlmRequest, LlmResponse, ToolError, ToolExecutor,
};
pub use errors::EngineError;
pub use turn_engine::TurnEngine;
pub use types::{EngineConfig, TurnOutcome, TurnStatus};
