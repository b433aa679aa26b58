//! Approval protocol types.
//!
//! A gated action (tool confirmation, user elicitation) is represented as an
//! [`ApprovalRequest`] raised by the engine and resolved by exactly one
//! [`ApprovalResponse`]. Timeout and cancellation are typed terminal
//! statuses on the response, never errors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{ApprovalId, SessionId};

/// What kind of decision is being requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalKind {
    /// Confirm or deny a sensitive tool call before execution.
    ToolConfirmation,
    /// Request additional input from the user.
    Elicitation,
}

/// Terminal status of an approval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// The action may proceed.
    Approved,
    /// The action must not proceed.
    Denied,
    /// The request was retired without a decision.
    Cancelled,
}

/// Why a request resolved as cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApprovalReason {
    /// The configured timeout elapsed with no response.
    Timeout,
    /// The system cancelled the request (abort, shutdown).
    SystemCancelled,
}

/// A request for an external yes/no decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Unique request ID; resolves exactly once.
    pub approval_id: ApprovalId,
    /// Decision kind.
    pub kind: ApprovalKind,
    /// Session the request belongs to.
    pub session_id: SessionId,
    /// Optional timeout in milliseconds. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Free-form context for the deciding surface (tool name, arguments, prompt).
    pub metadata: Map<String, Value>,
}

impl ApprovalRequest {
    /// Create a request with a fresh ID and no timeout.
    #[must_use]
    pub fn new(kind: ApprovalKind, session_id: SessionId, metadata: Map<String, Value>) -> Self {
        Self {
            approval_id: ApprovalId::new(),
            kind,
            session_id,
            timeout_ms: None,
            metadata,
        }
    }

    /// Set a timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// The resolution of an approval request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalResponse {
    /// ID of the request being resolved.
    pub approval_id: ApprovalId,
    /// Terminal status.
    pub status: ApprovalStatus,
    /// Reason, set for cancellations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ApprovalReason>,
    /// Optional payload (elicited input, denial note).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApprovalResponse {
    /// An approved response.
    #[must_use]
    pub fn approved(approval_id: ApprovalId) -> Self {
        Self {
            approval_id,
            status: ApprovalStatus::Approved,
            reason: None,
            data: None,
        }
    }

    /// A denied response.
    #[must_use]
    pub fn denied(approval_id: ApprovalId) -> Self {
        Self {
            approval_id,
            status: ApprovalStatus::Denied,
            reason: None,
            data: None,
        }
    }

    /// A cancelled response with the given reason.
    #[must_use]
    pub fn cancelled(approval_id: ApprovalId, reason: ApprovalReason) -> Self {
        Self {
            approval_id,
            status: ApprovalStatus::Cancelled,
            reason: Some(reason),
            data: None,
        }
    }

    /// Attach a payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns `true` if the action may proceed.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
