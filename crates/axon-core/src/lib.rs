//! # axon-core
//!
//! Foundation types, branded IDs, messages, and events for the Axon engine.
//!
//! This crate provides the shared vocabulary that all other Axon crates depend on:
//!
//! - **Branded IDs**: `SessionId`, `MessageId`, `ToolCallId`, `ApprovalId` as newtypes
//! - **Messages**: `Message` with a role and an ordered list of content parts
//! - **Content parts**: `ContentPart` enum covering text, images, files, tool calls,
//!   tool results, and reasoning
//! - **Approval protocol**: `ApprovalRequest` / `ApprovalResponse` with typed statuses
//! - **Events**: `AgentEvent` lifecycle notifications and the fire-and-forget `EventSink`

#![deny(unsafe_code)]

pub mod approval;
pub mod events;
pub mod ids;
pub mod messages;
pub mod tools;
