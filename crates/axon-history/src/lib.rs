//! # axon-history
//!
//! Durable, cached conversation history with debounced flush.
//!
//! - **Backing storage**: minimal `BackingStore` contract (append-log + key/value)
//!   with an in-memory reference backend
//! - **History store**: per-session ordered message log — synchronous durability
//!   for new messages, debounced batched writes for in-place updates, and an
//!   atomic snapshot-replace flush

#![deny(unsafe_code)]

pub mod errors;
pub mod history_store;
pub mod storage;

pub use errors::{HistoryError, StorageError, StorageOperation};
pub use history_store::HistoryStore;
pub use storage::{BackingStore, MemoryStore};
