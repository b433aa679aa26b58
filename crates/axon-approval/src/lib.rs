//! # axon-approval
//!
//! Asynchronous approval rendezvous with cancellation and timeout.
//!
//! [`ApprovalCoordinator`] correlates an approval request raised by the
//! engine with an eventually-arriving response from an external surface
//! (UI, CLI). Each request resolves exactly once: approved, denied, or
//! cancelled (timeout / system). Responses for unknown or already-resolved
//! requests are no-ops.

#![deny(unsafe_code)]

pub mod coordinator;

pub use coordinator::ApprovalCoordinator;
