//! Request/response rendezvous for gated actions.
//!
//! The pending map is keyed by approval ID; removing an entry from the map
//! is the single point of resolution, so each ID resolves exactly once no
//! matter how timeout, cancellation, and responses race.

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, instrument};

use axon_core::approval::{ApprovalReason, ApprovalRequest, ApprovalResponse};
use axon_core::events::{AgentEvent, BaseEvent, EventSink};
use axon_core::ids::ApprovalId;

/// Correlates approval requests with their eventual responses.
pub struct ApprovalCoordinator {
    pending: DashMap<ApprovalId, oneshot::Sender<ApprovalResponse>>,
    sink: EventSink,
}

impl ApprovalCoordinator {
    /// Create a coordinator emitting to the given sink.
    #[must_use]
    pub fn new(sink: EventSink) -> Self {
        Self {
            pending: DashMap::new(),
            sink,
        }
    }

    /// Raise a request and suspend until it resolves.
    ///
    /// The request is emitted as an `approval:request` event for external
    /// delivery. Resolution arrives via [`ApprovalCoordinator::resolve`] or
    /// [`ApprovalCoordinator::cancel`], or — when `timeout_ms` is set — by
    /// the timeout elapsing, which yields a `cancelled`/`timeout` response
    /// and emits a synthetic `approval:response` so external listeners can
    /// retire any UI prompt. No timeout means indefinite wait.
    #[instrument(skip_all, fields(approval_id = %request.approval_id, kind = ?request.kind))]
    pub async fn request(&self, request: ApprovalRequest) -> ApprovalResponse {
        let approval_id = request.approval_id.clone();
        let session_id = request.session_id.to_string();
        let timeout_ms = request.timeout_ms;

        let (tx, mut rx) = oneshot::channel();
        let _ = self.pending.insert(approval_id.clone(), tx);

        self.sink.emit(AgentEvent::ApprovalRequested {
            base: BaseEvent::now(&session_id),
            request,
        });
        debug!("approval requested");

        let received = if let Some(ms) = timeout_ms {
            match tokio::time::timeout(std::time::Duration::from_millis(ms), &mut rx).await {
                Ok(response) => response.ok(),
                Err(_elapsed) => {
                    // Removing the entry decides the race: if a resolver got
                    // there first, its response is (about to be) in the
                    // channel and we take that instead.
                    if self.pending.remove(&approval_id).is_some() {
                        let response = ApprovalResponse::cancelled(
                            approval_id.clone(),
                            ApprovalReason::Timeout,
                        );
                        self.sink.emit(AgentEvent::ApprovalResolved {
                            base: BaseEvent::now(&session_id),
                            response: response.clone(),
                        });
                        debug!("approval timed out");
                        return response;
                    }
                    rx.await.ok()
                }
            }
        } else {
            rx.await.ok()
        };

        received.unwrap_or_else(|| {
            // Sender dropped without a send — treat as a system cancel.
            ApprovalResponse::cancelled(approval_id, ApprovalReason::SystemCancelled)
        })
    }

    /// Deliver a response for a pending request.
    ///
    /// Returns `false` (and does nothing) when the ID is unknown or already
    /// resolved.
    pub fn resolve(&self, session_id: &str, response: ApprovalResponse) -> bool {
        let Some((_, tx)) = self.pending.remove(&response.approval_id) else {
            debug!(approval_id = %response.approval_id, "response for unknown approval ignored");
            return false;
        };
        self.sink.emit(AgentEvent::ApprovalResolved {
            base: BaseEvent::now(session_id),
            response: response.clone(),
        });
        let _ = tx.send(response);
        true
    }

    /// Cancel one pending request (`cancelled`/`systemCancelled`).
    pub fn cancel(&self, session_id: &str, approval_id: &ApprovalId) -> bool {
        self.resolve(
            session_id,
            ApprovalResponse::cancelled(approval_id.clone(), ApprovalReason::SystemCancelled),
        )
    }

    /// Cancel every pending request.
    pub fn cancel_all(&self, session_id: &str) {
        let ids: Vec<ApprovalId> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for approval_id in ids {
            let _ = self.cancel(session_id, &approval_id);
        }
    }

    /// Outstanding approval IDs (for rehydrating UI state after reconnect).
    #[must_use]
    pub fn pending_ids(&self) -> Vec<ApprovalId> {
        self.pending.iter().map(|entry| entry.key().clone()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
