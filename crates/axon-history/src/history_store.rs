//! Per-session durable message log with an in-process cache.
//!
//! [`HistoryStore`] keeps the canonical ordered message history for one
//! session. New messages are written through to the backing store
//! synchronously — they are durable the moment [`HistoryStore::save_message`]
//! returns. In-place updates (token-usage backfill during streaming) take the
//! cache fast path and are batched into one physical write by a debounced
//! flush.
//!
//! ## Write serialization
//!
//! A per-store I/O lock serializes every backing write: a `save_message`
//! append and a flush's snapshot-and-replace never interleave. The flush
//! snapshot is taken while holding the lock, so a save landing during an
//! in-flight flush appends after the replace — never lost, never
//! double-written. The dirty flag is generation-counted: a flush clears only
//! the generation it snapshotted, so updates arriving mid-flush keep the
//! store dirty for the next flush.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use axon_core::ids::SessionId;
use axon_core::messages::Message;

use crate::errors::HistoryError;
use crate::storage::BackingStore;

/// Debounce window for batching in-place updates into one write.
pub const FLUSH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Cap on messages loaded into the cache from the backing store.
pub const MAX_LOADED_MESSAGES: usize = 1_000;

struct Cache {
    loaded: bool,
    messages: Vec<Message>,
    /// Bumped on every in-place update.
    dirty_generation: u64,
    /// Last generation made durable by a flush.
    flushed_generation: u64,
    /// Pending debounce timer, if one is scheduled.
    flush_timer: Option<JoinHandle<()>>,
}

struct Inner {
    key: String,
    backing: Arc<dyn BackingStore>,
    debounce: Duration,
    cache: Mutex<Cache>,
    /// Serializes backing writes: save appends vs. flush snapshot-and-replace.
    io_lock: tokio::sync::Mutex<()>,
}

/// Durable, cached, ordered message log for one session.
///
/// Clone-able handle; clones share the same cache and backing key.
#[derive(Clone)]
pub struct HistoryStore {
    session_id: SessionId,
    inner: Arc<Inner>,
}

impl HistoryStore {
    /// Create a store for `session_id` with the default debounce window.
    #[must_use]
    pub fn new(session_id: SessionId, backing: Arc<dyn BackingStore>) -> Self {
        Self::with_debounce(session_id, backing, FLUSH_DEBOUNCE)
    }

    /// Create a store with an explicit debounce window.
    #[must_use]
    pub fn with_debounce(
        session_id: SessionId,
        backing: Arc<dyn BackingStore>,
        debounce: Duration,
    ) -> Self {
        let key = format!("history:{session_id}");
        Self {
            session_id,
            inner: Arc::new(Inner {
                key,
                backing,
                debounce,
                cache: Mutex::new(Cache {
                    loaded: false,
                    messages: Vec::new(),
                    dirty_generation: 0,
                    flushed_generation: 0,
                    flush_timer: None,
                }),
                io_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// The session this store belongs to.
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Load (once) and return a defensive copy of the history.
    ///
    /// The first call populates the cache from the backing store, dropping
    /// duplicate message IDs (first occurrence wins — duplicates indicate
    /// prior corruption and are logged).
    pub async fn get_history(&self) -> Result<Vec<Message>, HistoryError> {
        self.inner.ensure_loaded().await?;
        Ok(self.inner.cache.lock().messages.clone())
    }

    /// Append a message to the cache and the backing log.
    ///
    /// The message is durable when this returns. On backing failure the
    /// cache entry is rolled back and the error surfaces.
    pub async fn save_message(&self, message: Message) -> Result<(), HistoryError> {
        self.inner.ensure_loaded().await?;
        let item = serde_json::to_value(&message).map_err(|source| HistoryError::Encode {
            id: message.id.clone(),
            source,
        })?;

        let _io = self.inner.io_lock.lock().await;
        let id = message.id.clone();
        self.inner.cache.lock().messages.push(message);

        if let Err(err) = self.inner.backing.append(&self.inner.key, item).await {
            let mut cache = self.inner.cache.lock();
            if let Some(pos) = cache.messages.iter().rposition(|m| m.id == id) {
                let _ = cache.messages.remove(pos);
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// Update a cached message in place and schedule a debounced flush.
    ///
    /// Unknown IDs are ignored with a warning. Durability: within one
    /// debounce window, or immediately on [`HistoryStore::flush`].
    pub fn update_message(&self, message: Message) {
        let mut cache = self.inner.cache.lock();
        let Some(pos) = cache.messages.iter().position(|m| m.id == message.id) else {
            warn!(message_id = %message.id, "update for unknown message id ignored");
            return;
        };
        cache.messages[pos] = message;
        cache.dirty_generation += 1;

        let timer_active = cache
            .flush_timer
            .as_ref()
            .is_some_and(|handle| !handle.is_finished());
        if !timer_active {
            let inner = Arc::clone(&self.inner);
            cache.flush_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(inner.debounce).await;
                if let Err(error) = inner.flush().await {
                    error!(%error, "debounced history flush failed");
                }
            }));
        }
    }

    /// Force pending updates to durable storage now.
    ///
    /// Idempotent; a concurrent caller awaits the in-flight flush (on the
    /// I/O lock) and then observes a clean dirty flag instead of re-writing.
    pub async fn flush(&self) -> Result<(), HistoryError> {
        self.inner.flush().await
    }

    /// Cancel any pending flush, then clear the backing log and the cache.
    pub async fn clear_history(&self) -> Result<(), HistoryError> {
        {
            let mut cache = self.inner.cache.lock();
            if let Some(handle) = cache.flush_timer.take() {
                handle.abort();
            }
        }

        let _io = self.inner.io_lock.lock().await;
        self.inner.backing.delete(&self.inner.key).await?;

        let mut cache = self.inner.cache.lock();
        cache.messages.clear();
        cache.loaded = true;
        cache.dirty_generation = 0;
        cache.flushed_generation = 0;
        debug!(session_id = %self.session_id, "history cleared");
        Ok(())
    }
}

impl Inner {
    async fn ensure_loaded(&self) -> Result<(), HistoryError> {
        if self.cache.lock().loaded {
            return Ok(());
        }

        let _io = self.io_lock.lock().await;
        // A concurrent caller may have finished loading while we waited.
        if self.cache.lock().loaded {
            return Ok(());
        }

        let raw = self
            .backing
            .get_range(&self.key, 0, MAX_LOADED_MESSAGES)
            .await?;
        if raw.len() >= MAX_LOADED_MESSAGES {
            warn!(
                key = %self.key,
                cap = MAX_LOADED_MESSAGES,
                "history reached load cap; older messages not cached"
            );
        }

        let mut seen = HashSet::new();
        let mut messages = Vec::with_capacity(raw.len());
        for item in raw {
            let message: Message =
                serde_json::from_value(item).map_err(|source| HistoryError::Decode { source })?;
            if seen.insert(message.id.clone()) {
                messages.push(message);
            } else {
                warn!(message_id = %message.id, "duplicate message id in backing log dropped");
            }
        }

        let mut cache = self.cache.lock();
        cache.messages = messages;
        cache.loaded = true;
        Ok(())
    }

    async fn flush(&self) -> Result<(), HistoryError> {
        let _io = self.io_lock.lock().await;

        let (snapshot, snapshot_generation) = {
            let cache = self.cache.lock();
            if cache.dirty_generation == cache.flushed_generation {
                return Ok(());
            }
            (cache.messages.clone(), cache.dirty_generation)
        };

        let mut items = Vec::with_capacity(snapshot.len());
        for message in &snapshot {
            items.push(
                serde_json::to_value(message).map_err(|source| HistoryError::Encode {
                    id: message.id.clone(),
                    source,
                })?,
            );
        }

        // Atomic from the cache's point of view: saves also take the I/O
        // lock, so nothing interleaves with the replace.
        self.backing.delete(&self.key).await?;
        for item in items {
            self.backing.append(&self.key, item).await?;
        }

        let mut cache = self.cache.lock();
        if cache.flushed_generation < snapshot_generation {
            cache.flushed_generation = snapshot_generation;
        }
        debug!(key = %self.key, messages = snapshot.len(), "history flushed");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
