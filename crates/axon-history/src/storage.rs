//! Backing storage contract and the in-memory reference backend.
//!
//! The history store only needs an ordered append-log plus a small key/value
//! surface. Concrete drivers (Redis, Postgres, SQLite) implement
//! [`BackingStore`] elsewhere; [`MemoryStore`] is the in-process backend used
//! by tests and ephemeral sessions.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::errors::StorageError;

/// Minimal storage contract consumed by the history store.
///
/// Keys are namespaced strings (e.g. `history:<session-id>`). Log items are
/// opaque JSON values; ordering within a key is insertion order.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Append an item to the log at `key`.
    async fn append(&self, key: &str, item: Value) -> Result<(), StorageError>;

    /// Read up to `count` items from the log at `key`, starting at `start`.
    async fn get_range(
        &self,
        key: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<Value>, StorageError>;

    /// Delete the log and any value stored at `key`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Read the value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Write the value stored at `key`.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// In-memory [`BackingStore`] backed by concurrent maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: DashMap<String, Vec<Value>>,
    values: DashMap<String, Value>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items in the log at `key` (test/diagnostic helper).
    #[must_use]
    pub fn log_len(&self, key: &str) -> usize {
        self.logs.get(key).map_or(0, |log| log.len())
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn append(&self, key: &str, item: Value) -> Result<(), StorageError> {
        self.logs.entry(key.to_owned()).or_default().push(item);
        Ok(())
    }

    async fn get_range(
        &self,
        key: &str,
        start: usize,
        count: usize,
    ) -> Result<Vec<Value>, StorageError> {
        Ok(self.logs.get(key).map_or_else(Vec::new, |log| {
            log.iter().skip(start).take(count).cloned().collect()
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _ = self.logs.remove(key);
        let _ = self.values.remove(key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.get(key).map(|value| value.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _ = self.values.insert(key.to_owned(), value);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn append_and_get_range() {
        let store = MemoryStore::new();
        store.append("k", json!(1)).await.unwrap();
        store.append("k", json!(2)).await.unwrap();
        store.append("k", json!(3)).await.unwrap();

        let all = store.get_range("k", 0, 10).await.unwrap();
        assert_eq!(all, vec![json!(1), json!(2), json!(3)]);

        let middle = store.get_range("k", 1, 1).await.unwrap();
        assert_eq!(middle, vec![json!(2)]);
    }

    #[tokio::test]
    async fn get_range_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.get_range("nope", 0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_log_and_value() {
        let store = MemoryStore::new();
        store.append("k", json!(1)).await.unwrap();
        store.set("k", json!({"meta": true})).await.unwrap();

        store.delete("k").await.unwrap();

        assert!(store.get_range("k", 0, 10).await.unwrap().is_empty());
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_and_get_value() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());
        store.set("k", json!("v")).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!("v")));
    }

    #[tokio::test]
    async fn logs_are_keyed_independently() {
        let store = MemoryStore::new();
        store.append("a", json!(1)).await.unwrap();
        store.append("b", json!(2)).await.unwrap();
        assert_eq!(store.log_len("a"), 1);
        assert_eq!(store.log_len("b"), 1);
    }
}
