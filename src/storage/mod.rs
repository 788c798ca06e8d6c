//! Storage Module
//!
//! This module owns the key → value mapping and everything needed to read
//! and write it safely from many threads at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲ get / put / delete          ▲ lock (all shards)
//! ```
//!
//! ## Atomicity
//!
//! There are two write primitives:
//!
//! - [`Storage::put`] runs an updater closure against the current value while
//!   holding the key's shard lock. Read, compute and write happen as one step.
//! - [`Storage::lock`] returns a [`StorageGuard`] holding every shard lock, for
//!   callers that need several reads and writes to appear as one operation.
//!   The lock is released when the guard is dropped.
//!
//! Expired values are never returned: every read and every updater sees an
//! expired key as absent.
//!
//! ## Example
//!
//! ```
//! use nimbuskv::storage::{Storage, StorageEngine, Value};
//!
//! let engine = StorageEngine::new();
//! engine
//!     .put("name".to_string(), |_| Ok(Some(Value::string("value"))))
//!     .unwrap();
//!
//! assert_eq!(engine.get("name").unwrap(), Some(Value::string("value")));
//! ```

pub mod engine;
pub mod value;

use crate::error::Result;
use std::collections::HashMap;

pub use engine::{StorageEngine, StorageStats, DEFAULT_SHARDS};
pub use value::{Key, Value, ValueData, ValueKind};

/// Operations available while the store-wide lock is held.
///
/// Semantics match the same-named [`Storage`] methods. The lock is released
/// when the guard goes out of scope.
pub trait StorageGuard {
    fn get(&self, key: &str) -> Result<Option<Value>>;

    fn put<F>(&mut self, key: Key, updater: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Result<Option<Value>>;

    fn delete(&mut self, key: &str) -> Result<()>;

    /// Releases the lock. Equivalent to dropping the guard.
    fn unlock(self)
    where
        Self: Sized,
    {
    }
}

/// The contract commands are written against.
pub trait Storage: Send + Sync {
    type Guard<'a>: StorageGuard
    where
        Self: 'a;

    /// Returns the live value for `key`.
    ///
    /// An expired value is evicted and reported as `None`.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Atomically replaces the value for `key` with whatever `updater` returns.
    ///
    /// The updater receives the current live value (`None` if absent or
    /// expired). Returning `Ok(Some(v))` stores `v`, including its expiry;
    /// `Ok(None)` removes the key; `Err(e)` leaves the store untouched and
    /// `e` is returned from `put`.
    fn put<F>(&self, key: Key, updater: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Result<Option<Value>>;

    /// Removes `key`. Succeeds whether or not the key existed.
    fn delete(&self, key: &str) -> Result<()>;

    /// Snapshot of all live entries.
    fn all(&self) -> Result<HashMap<Key, Value>>;

    /// Acquires the store-wide exclusive lock.
    ///
    /// Not reentrant: calling any other method on this store from the thread
    /// holding the guard deadlocks. Use the guard's own methods instead.
    fn lock(&self) -> Result<Self::Guard<'_>>;
}
